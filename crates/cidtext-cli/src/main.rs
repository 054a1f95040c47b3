mod cli;
mod page_range;
mod runs_cmd;
mod shared;
mod text_cmd;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        cli::Commands::Text {
            ref file,
            ref pages,
            ref format,
            y_tolerance,
            clip,
            no_page_marker,
        } => text_cmd::run(&text_cmd::TextArgs {
            file,
            pages: pages.as_deref(),
            format,
            y_tolerance,
            clip,
            page_marker: !no_page_marker,
        }),
        cli::Commands::Runs {
            ref file,
            ref pages,
            ref format,
        } => runs_cmd::run(file, pages.as_deref(), format),
    };

    if let Err(code) = result {
        std::process::exit(code);
    }
}
