// Copyright 2025 - present Mallard Project Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::Parser;
use log::LevelFilter;
use node::NodeConfig;
use std::process;

#[derive(Parser)]
#[command(name = "mallard", about = "PostgreSQL wire protocol gateway for an embedded analytic database")]
struct Args {
    /// server listen port
    #[arg(short, long, default_value_t = 5432)]
    port: u16,

    /// server log level: {TRACE, DEBUG, INFO, WARNING, ERROR, FATAL}
    #[arg(short, long, default_value = "INFO")]
    log: String,

    /// directory holding the database files
    #[arg(short, long, default_value = ".")]
    data_dir: String,
}

fn main() {
    let args = Args::parse();

    let level = match args.log.to_uppercase().as_str() {
        "TRACE" => LevelFilter::Trace,
        "DEBUG" => LevelFilter::Debug,
        "INFO" => LevelFilter::Info,
        "WARNING" => LevelFilter::Warn,
        "ERROR" => LevelFilter::Error,
        "FATAL" => LevelFilter::Error,
        unknown => {
            eprintln!("Unknown log level: {}", unknown);
            eprintln!("Must be one of: TRACE, DEBUG, INFO, WARNING, ERROR, FATAL");
            process::exit(1);
        }
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .expect("logger is installed once");

    log::info!("start on port {}", args.port);
    if let Err(error) = node::start(NodeConfig::new(args.port, &args.data_dir)) {
        log::error!("server failed: {}", error);
        process::exit(1);
    }
}
