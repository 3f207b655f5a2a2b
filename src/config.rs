// Command-line surface and run configuration for Reflector
// Uses clap's builder API; everything parsed ends up in one ScanConfig value

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

use crate::correlator::HostFilter;
use crate::decoder::{Decoder, TextFilter, DEFAULT_MAX_DEPTH};
use crate::input::{expand_inputs, InputSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Print every decodable parameter value
    Dump,
    /// Print only values reflected in the response body, as JSON
    Reflect,
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub mode: Mode,
    pub inputs: Vec<InputSource>,
    pub hosts: HostFilter,
    pub text_filter: TextFilter,
    pub max_depth: usize,
    pub pretty: bool,
    pub csv_report: bool,
    pub markdown_report: bool,
    pub verbosity: u8,
}

impl ScanConfig {
    /// Config with the per-mode defaults the CLI would pick
    pub fn new(mode: Mode, inputs: Vec<InputSource>) -> Self {
        let text_filter = match mode {
            Mode::Dump => TextFilter::Printable,
            Mode::Reflect => TextFilter::Lossy,
        };
        Self {
            mode,
            inputs,
            hosts: HostFilter::default(),
            text_filter,
            max_depth: DEFAULT_MAX_DEPTH,
            pretty: false,
            csv_report: false,
            markdown_report: false,
            verbosity: 0,
        }
    }

    pub fn from_matches(matches: &ArgMatches) -> Self {
        let verbosity = matches.get_count("verbose");
        let (name, sub) = matches
            .subcommand()
            .unwrap_or(("dump", matches));
        let mode = if name == "reflect" { Mode::Reflect } else { Mode::Dump };

        let text_filter = if sub.get_flag("strict_base64") {
            TextFilter::Printable
        } else if sub.get_flag("lossy_base64") {
            TextFilter::Lossy
        } else {
            // Reflect mode follows binary-looking base64 too
            match mode {
                Mode::Dump => TextFilter::Printable,
                Mode::Reflect => TextFilter::Lossy,
            }
        };
        let max_depth = sub.get_one::<usize>("max_depth").copied().unwrap_or(DEFAULT_MAX_DEPTH);

        let (inputs, hosts, pretty, csv_report, markdown_report) = match mode {
            Mode::Dump => {
                let paths: Vec<PathBuf> = sub
                    .get_many::<PathBuf>("har_files")
                    .map(|v| v.cloned().collect())
                    .unwrap_or_default();
                (expand_inputs(paths.as_slice()), HostFilter::default(), false, false, false)
            }
            Mode::Reflect => {
                let lists: Vec<String> = sub
                    .get_many::<String>("hosts")
                    .map(|v| v.cloned().collect())
                    .unwrap_or_default();
                (
                    vec![InputSource::Stdin],
                    HostFilter::new(lists.as_slice()),
                    sub.get_flag("pretty"),
                    sub.get_flag("csv_report"),
                    sub.get_flag("markdown_report"),
                )
            }
        };

        Self {
            mode,
            inputs,
            hosts,
            text_filter,
            max_depth,
            pretty,
            csv_report,
            markdown_report,
            verbosity,
        }
    }

    pub fn decoder(&self) -> Decoder {
        Decoder::new(self.text_filter).with_max_depth(self.max_depth)
    }
}

fn decoding_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("strict_base64")
            .long("strict-base64")
            .action(ArgAction::SetTrue)
            .conflicts_with("lossy_base64")
            .help("Only follow base64 values that decode to printable UTF-8 text"))
        .arg(Arg::new("lossy_base64")
            .long("lossy-base64")
            .action(ArgAction::SetTrue)
            .help("Follow every base64 value, replacing invalid UTF-8"))
        .arg(Arg::new("max_depth")
            .long("max-depth")
            .num_args(1)
            .value_parser(clap::value_parser!(usize))
            .help("Maximum number of nested decoding steps per value"))
}

pub fn build_command() -> Command {
    Command::new("reflector")
        .version(clap::crate_version!())
        .author("Jake Abendroth")
        .about("Finds request parameters reflected in the response bodies of .har captures")
        .after_help(concat!(
            "EXAMPLES:\n",
            "  reflector dump capture.har more/\n",
            "  reflector reflect --hosts \"example.com api.example.com\" < capture.har\n\n",
            "Logging goes to stderr; set RUST_LOG or pass -v/-vv for more detail."
        ))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .action(ArgAction::Count)
            .global(true)
            .help("Increase log verbosity (-v debug, -vv trace)"))
        .subcommand(decoding_args(Command::new("dump")
            .about("Print every decodable parameter value of every request")
            .arg(Arg::new("har_files")
                .value_name("HAR_FILE")
                .num_args(0..)
                .value_parser(clap::value_parser!(PathBuf))
                .help("HAR files or directories of .har files (default: stdin)"))))
        .subcommand(decoding_args(Command::new("reflect")
            .about(concat!(
                "Read a HAR archive from stdin and print parameter values ",
                "reflected in responses as JSON"
            ))
            .arg(Arg::new("hosts")
                .long("hosts")
                .num_args(1)
                .action(ArgAction::Append)
                .help("Space-separated list of request hosts to include (default: all)"))
            .arg(Arg::new("pretty")
                .long("pretty")
                .action(ArgAction::SetTrue)
                .help("Pretty-print the JSON output"))
            .arg(Arg::new("csv_report")
                .long("csv-report")
                .action(ArgAction::SetTrue)
                .help("Also write a timestamped CSV report"))
            .arg(Arg::new("markdown_report")
                .long("markdown-report")
                .action(ArgAction::SetTrue)
                .help("Also write a timestamped Markdown report"))))
}
