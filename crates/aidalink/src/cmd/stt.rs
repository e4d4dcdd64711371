use aidalink_frame::ChannelId;
use serde::Serialize;

use crate::cmd::{connect, SttArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct Transcript<'a> {
    text: &'a str,
}

pub fn run(args: SttArgs, format: OutputFormat) -> CliResult<i32> {
    let link = connect(&args.robot, &[ChannelId::Stt])?;
    link.request_stt()
        .map_err(|err| session_error("request failed", err))?;
    let text = link
        .receive_stt()
        .map_err(|err| session_error("receive failed", err))?;

    match format {
        OutputFormat::Json => print_json(&Transcript { text: &text }),
        OutputFormat::Table | OutputFormat::Pretty | OutputFormat::Raw => println!("{text}"),
    }
    Ok(SUCCESS)
}
