//Replay selector values for one switched camera and print the source it
//routes after each value

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tag_vision::{
    config::{VisionConfig, DEFAULT_CONFIG_PATH},
    coprocessor::Coprocessor,
    table::{InMemoryTable, TableSink, TableValue},
    utils::set_log_config,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    //camera/network configuration
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    //name of the switched camera
    #[arg(short, long)]
    switched: String,
    //values written to the selector key: integers, decimals or camera names
    values: Vec<String>,
}

fn parse_value(raw: &str) -> TableValue {
    if let Ok(index) = raw.parse::<i64>() {
        TableValue::Integer(index)
    } else if let Ok(index) = raw.parse::<f64>() {
        TableValue::Double(index)
    } else {
        TableValue::String(raw.to_string())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let log = set_log_config();

    let config = VisionConfig::load(&args.config, &log)?;
    let table = Arc::new(InMemoryTable::new());
    let coprocessor = Coprocessor::start(&config, table.as_ref(), &log);

    let camera = coprocessor
        .switched_camera(&args.switched)
        .ok_or_else(|| format!("no switched camera named '{}'", args.switched))?;
    let stream = coprocessor
        .switched_stream(&args.switched)
        .ok_or_else(|| format!("no switched stream named '{}'", args.switched))?;

    for raw in &args.values {
        table.set(&camera.config().key, parse_value(raw));
        let source = stream
            .active_source()
            .and_then(|index| coprocessor.registry().get(index))
            .map(|camera| camera.name.as_str())
            .unwrap_or("<none>");
        println!("{} -> {}", raw, source);
    }
    Ok(())
}
