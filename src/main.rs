mod cmd;
mod input;
mod tax;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "kestc",
    version,
    about = "Calculate Austrian KESt gains on fund shares (FIFO)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Per-transaction report with realized gains
    Report(cmd::report::ReportCommand),
    /// Yearly realized gains per fund
    Summary(cmd::summary::SummaryCommand),
    /// Purchase lots still open after all disposals
    Lots(cmd::lots::LotsCommand),
    /// Check the export for unmatched disposals and invalid exchange rates
    Validate(cmd::validate::ValidateCommand),
    /// Print input and output formats
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Report(report) => report.exec(),
        Command::Summary(summary) => summary.exec(),
        Command::Lots(lots) => lots.exec(),
        Command::Validate(validate) => validate.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
