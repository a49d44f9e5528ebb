#[macro_use]
extern crate log;

use std::env;
use std::fs::File;
use std::process::ExitCode;

use zvm::config::Config;
use zvm::zmachine::ZMachine;

use terminal::StdioTerminal;

mod files;
mod terminal;

fn initialize_config() -> Config {
    if let Some(filename) = files::config_file("config.yml") {
        match File::open(&filename) {
            Ok(f) => match Config::try_from(f) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error parsing configuration from {}: {}", filename, e);
                    Config::default()
                }
            },
            Err(e) => {
                eprintln!("Error reading configuration from {}: {}", filename, e);
                Config::default()
            }
        }
    } else {
        Config::default()
    }
}

fn initialize_logging(config: &Config, name: &str) {
    if !config.logging() {
        return;
    }

    if let Some(filename) = files::config_file("log4rs.yml") {
        if let Err(e) = log4rs::init_file(&filename, Default::default()) {
            eprintln!("Error initializing logging from {}: {}", filename, e);
            return;
        }

        log_mdc::insert("instruction_count", format!("{:8x}", 0));
        info!(target: "app::instruction", "Start instruction log for '{}'", name);
        info!(target: "app::object", "Start object log for '{}'", name);
        info!(target: "app::stack", "Start stack log for '{}'", name);
        info!(target: "app::screen", "Start screen log for '{}'", name);
        info!(target: "app::state", "Start state log for '{}'", name);
        info!(target: "app::stream", "Start stream log for '{}'", name);
        info!(target: "app::text", "Start text log for '{}'", name);
        info!(target: "app::state", "Configuration: {:?}", config);
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let filename = match args.get(1) {
        Some(f) => f,
        None => {
            eprintln!("Usage: zvm <story-file>");
            return ExitCode::FAILURE;
        }
    };

    let name = files::story_name(filename);
    let config = initialize_config();
    initialize_logging(&config, &name);

    let zcode = match files::read_story(filename) {
        Ok(data) => data,
        Err(e) => {
            error!(target: "app::state", "{}", e);
            eprintln!("{}", e.message());
            return ExitCode::FAILURE;
        }
    };

    let terminal = Box::new(StdioTerminal::new(80, 24));
    match ZMachine::new(zcode, &config, terminal) {
        Ok(mut zmachine) => {
            trace!("Beginning execution of '{}'", name);
            match zmachine.run() {
                Ok(_) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("{}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
