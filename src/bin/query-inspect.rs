use clap::{Parser, ValueEnum};
use serde_json::json;

use resource_gateway::query::{QueryTranslator, RawQueryParams};
use resource_gateway::security::pollution::PollutionStage;

#[derive(Parser)]
#[command(name = "query-inspect")]
#[command(about = "Show the store query a resource query string translates to", long_about = None)]
struct Cli {
    /// Query string, with or without the leading `?`.
    query: String,

    /// Apply parameter pollution defense first.
    #[arg(long)]
    sanitize: bool,

    /// Names allowed to repeat when sanitizing.
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "duration,ratingsQuantity,ratingsAverage,maxGroupSize,difficulty,price"
    )]
    whitelist: Vec<String>,

    #[arg(long, value_enum, default_value_t = Output::Pretty)]
    output: Output,
}

#[derive(Clone, Copy, ValueEnum)]
enum Output {
    Pretty,
    Compact,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut params = RawQueryParams::parse(cli.query.trim_start_matches('?'));
    let mut collapsed = Vec::new();
    if cli.sanitize {
        collapsed = PollutionStage::new("", cli.whitelist).clean(&mut params);
    }

    let query = QueryTranslator::new(params)
        .filter()
        .sort()
        .limit_fields()
        .paginate()
        .into_query()?;

    let report = json!({
        "collapsed": collapsed,
        "query": query.to_document(),
    });

    let rendered = match cli.output {
        Output::Pretty => serde_json::to_string_pretty(&report)?,
        Output::Compact => serde_json::to_string(&report)?,
    };
    println!("{rendered}");
    Ok(())
}
