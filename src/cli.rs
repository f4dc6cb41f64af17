use clap::{App, AppSettings, Arg, ArgMatches, ErrorKind as ClapErrorKind};

use crate::client::WireFormat;
use crate::errors::CtlError;
use crate::launcher::LaunchMode;
use crate::topology::GroupingPolicy;

const MOCKNET_DIR: &str = "MOCKNET_DIR";
const INDRADB_DIR: &str = "INDRADB_DIR";
const IP: &str = "IP";
const MOCKNET_PORT: &str = "MOCKNET_PORT";
const INDRADB_PORT: &str = "INDRADB_PORT";
const SERVER_CHECK_PORT: &str = "SERVER_CHECK_PORT";
const IMAGE: &str = "IMAGE";
const CONFIG_FILE: &str = "CONFIG_FILE";
const LAUNCH: &str = "LAUNCH";
const WIRE: &str = "WIRE";
const LENIENT_TOPOLOGY: &str = "LENIENT_TOPOLOGY";

const DEFAULT_BIN_DIR: &str = "./target/debug";
const DEFAULT_CONFIG_FILE_NAME: &str = "cluster_config_template.json";

/// Everything the client needs to know before the operation loop starts.
///
/// Built once by the initialization phase and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtlConfig {
    pub mocknet_dir: String,
    pub indradb_dir: String,
    pub ip: String,
    pub mocknet_port: u16,
    pub indradb_port: u16,
    pub server_check_port: u16,
    pub image: String,
    pub config_file: String,
    pub launch: LaunchMode,
    pub wire: WireFormat,
    pub grouping: GroupingPolicy,
}

impl Default for CtlConfig {
    fn default() -> Self {
        Self {
            mocknet_dir: DEFAULT_BIN_DIR.to_string(),
            indradb_dir: DEFAULT_BIN_DIR.to_string(),
            ip: "127.0.0.1".to_string(),
            mocknet_port: 3030,
            indradb_port: 3031,
            server_check_port: 4040,
            image: "ubuntu:20.10".to_string(),
            config_file: default_config_file(DEFAULT_BIN_DIR),
            launch: LaunchMode::None,
            wire: WireFormat::Service,
            grouping: GroupingPolicy::Strict,
        }
    }
}

impl CtlConfig {
    /// Base URL of the emunet REST API, always ending with a slash.
    pub fn service_url(&self) -> String {
        format!("http://{}:{}/v1/", self.ip, self.mocknet_port)
    }

    pub fn mocknet_addr(&self) -> String {
        format!("{}:{}", self.ip, self.mocknet_port)
    }

    pub fn indradb_addr(&self) -> String {
        format!("{}:{}", self.ip, self.indradb_port)
    }

    pub fn server_check_addr(&self) -> String {
        format!("{}:{}", self.ip, self.server_check_port)
    }
}

fn default_config_file(mocknet_dir: &str) -> String {
    format!("{}/{}", mocknet_dir.trim_end_matches('/'), DEFAULT_CONFIG_FILE_NAME)
}

/// Outcome of one line typed during the initialization phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitLine {
    Config(CtlConfig),
    Help(String),
    Exit,
}

fn build_init_parser() -> App<'static, 'static> {
    App::new("mocknet(initializing)")
        .about("Process the initial command")
        .after_help(
            "The short forms -msd, -isd, -ip, -mnp, -idp, -scp and -img are accepted for \
             --mocknet_dir, --indradb_dir, --ip, --mocknet_port, --indradb_port, \
             --server_check_port and --image.",
        )
        .setting(AppSettings::NoBinaryName)
        .setting(AppSettings::DisableVersion)
        .setting(AppSettings::ColorNever)
        .setting(AppSettings::AllowNegativeNumbers)
        .arg(
            Arg::with_name(MOCKNET_DIR)
                .help("directory of the mocknet binaries")
                .long("mocknet_dir")
                .value_name(MOCKNET_DIR)
                .takes_value(true)
                .default_value(DEFAULT_BIN_DIR),
        )
        .arg(
            Arg::with_name(INDRADB_DIR)
                .help("directory of the indradb binaries")
                .long("indradb_dir")
                .value_name(INDRADB_DIR)
                .takes_value(true)
                .default_value(DEFAULT_BIN_DIR),
        )
        .arg(
            Arg::with_name(IP)
                .help("ipv4 address of the mocknet servers")
                .short("i")
                .long("ip")
                .value_name(IP)
                .takes_value(true)
                .default_value("127.0.0.1"),
        )
        .arg(
            Arg::with_name(MOCKNET_PORT)
                .help("port of the mocknet server")
                .long("mocknet_port")
                .value_name(MOCKNET_PORT)
                .takes_value(true)
                .default_value("3030"),
        )
        .arg(
            Arg::with_name(INDRADB_PORT)
                .help("port of the indradb server")
                .long("indradb_port")
                .value_name(INDRADB_PORT)
                .takes_value(true)
                .default_value("3031"),
        )
        .arg(
            Arg::with_name(SERVER_CHECK_PORT)
                .help("port of the server check service")
                .long("server_check_port")
                .value_name(SERVER_CHECK_PORT)
                .takes_value(true)
                .default_value("4040"),
        )
        .arg(
            Arg::with_name(IMAGE)
                .help("base operating system image")
                .long("image")
                .value_name(IMAGE)
                .takes_value(true)
                .default_value("ubuntu:20.10"),
        )
        .arg(
            Arg::with_name(CONFIG_FILE)
                .help("cluster topology file, default=<mocknet_dir>/cluster_config_template.json")
                .short("c")
                .long("config")
                .value_name(CONFIG_FILE)
                .takes_value(true),
        )
        .arg(
            Arg::with_name(LAUNCH)
                .help("how to start the local services")
                .long("launch")
                .value_name(LAUNCH)
                .takes_value(true)
                .possible_values(&["none", "terminal", "docker"])
                .default_value("none"),
        )
        .arg(
            Arg::with_name(WIRE)
                .help("request field names used by netdel/usrdel")
                .long("wire")
                .value_name(WIRE)
                .takes_value(true)
                .possible_values(&["service", "legacy"])
                .default_value("service"),
        )
        .arg(
            Arg::with_name(LENIENT_TOPOLOGY)
                .help("drop incomplete trailing node/link groups instead of rejecting the command")
                .long("lenient-topology"),
        )
}

/// Help text of the initialization mini-grammar.
pub fn init_help() -> String {
    let mut buf = Vec::new();
    // writing into a Vec can not fail
    let _ = build_init_parser().write_help(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Parse one line typed at the `mocknet(initializing)>` prompt.
///
/// A blank line yields the default configuration.
pub fn parse_init_line(line: &str) -> Result<InitLine, CtlError> {
    if line == "exit" {
        return Ok(InitLine::Exit);
    }

    let tokens: Vec<&str> = line.split_whitespace().map(long_form).collect();
    let matches = match build_init_parser().get_matches_from_safe(tokens) {
        Ok(matches) => matches,
        Err(e) if e.kind == ClapErrorKind::HelpDisplayed => return Ok(InitLine::Help(e.message)),
        Err(e) => return Err(CtlError::grammar(first_line(&e.message))),
    };

    Ok(InitLine::Config(config_from_matches(&matches)?))
}

// multi-letter short flags of the first mocknet shell; clap would read
// `-ip` as `-i p`
fn long_form(token: &str) -> &str {
    match token {
        "-msd" => "--mocknet_dir",
        "-isd" => "--indradb_dir",
        "-ip" => "--ip",
        "-mnp" => "--mocknet_port",
        "-idp" => "--indradb_port",
        "-scp" => "--server_check_port",
        "-img" => "--image",
        other => other,
    }
}

fn config_from_matches(matches: &ArgMatches<'_>) -> Result<CtlConfig, CtlError> {
    let mocknet_dir = value(matches, MOCKNET_DIR);
    let config_file = match matches.value_of(CONFIG_FILE) {
        Some(path) => path.to_string(),
        None => default_config_file(&mocknet_dir),
    };

    let launch = match matches.value_of(LAUNCH) {
        Some("terminal") => LaunchMode::Terminal,
        Some("docker") => LaunchMode::Docker,
        _ => LaunchMode::None,
    };
    let wire = match matches.value_of(WIRE) {
        Some("legacy") => WireFormat::Legacy,
        _ => WireFormat::Service,
    };
    let grouping = if matches.is_present(LENIENT_TOPOLOGY) {
        GroupingPolicy::Lenient
    } else {
        GroupingPolicy::Strict
    };

    Ok(CtlConfig {
        mocknet_dir,
        indradb_dir: value(matches, INDRADB_DIR),
        ip: value(matches, IP),
        mocknet_port: port(matches, MOCKNET_PORT)?,
        indradb_port: port(matches, INDRADB_PORT)?,
        server_check_port: port(matches, SERVER_CHECK_PORT)?,
        image: value(matches, IMAGE),
        config_file,
        launch,
        wire,
        grouping,
    })
}

// every caller passes an argument that carries a default value
fn value(matches: &ArgMatches<'_>, name: &str) -> String {
    matches.value_of(name).unwrap_or_default().to_string()
}

fn port(matches: &ArgMatches<'_>, name: &str) -> Result<u16, CtlError> {
    let raw = matches.value_of(name).unwrap_or_default();
    raw.parse::<u16>()
        .map_err(|_| CtlError::parse(format!("invalid port '{}' for {}", raw, name.to_lowercase())))
}

// clap messages carry a usage section, the REPL only shows the first line
pub(crate) fn first_line(message: &str) -> String {
    message
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("invalid input")
        .trim_start_matches("error: ")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn config(line: &str) -> CtlConfig {
        match parse_init_line(line).unwrap() {
            InitLine::Config(config) => config,
            other => panic!("expected a configuration, got {:?}", other),
        }
    }

    #[test]
    fn blank_line_uses_defaults() {
        assert_eq!(config(""), CtlConfig::default());
        assert_eq!(config("   "), CtlConfig::default());
        assert_eq!(CtlConfig::default().service_url(), "http://127.0.0.1:3030/v1/");
    }

    #[test]
    fn overrides() {
        let c = config(
            "-i 10.0.0.8 --mocknet_port 8080 --indradb_port 27615 --image ubuntu:22.04 --launch docker --wire legacy --lenient-topology",
        );
        assert_eq!(c.ip, "10.0.0.8");
        assert_eq!(c.mocknet_port, 8080);
        assert_eq!(c.indradb_port, 27615);
        assert_eq!(c.server_check_port, 4040);
        assert_eq!(c.image, "ubuntu:22.04");
        assert_eq!(c.launch, LaunchMode::Docker);
        assert_eq!(c.wire, WireFormat::Legacy);
        assert_eq!(c.grouping, GroupingPolicy::Lenient);
        assert_eq!(c.service_url(), "http://10.0.0.8:8080/v1/");
        assert_eq!(c.indradb_addr(), "10.0.0.8:27615");
    }

    #[test]
    fn multi_letter_short_flags() {
        let c = config("-msd /opt/mn -isd /opt/idb -ip 10.0.0.1 -mnp 8080 -idp 8081 -scp 8082 -img debian:11");
        assert_eq!(c.mocknet_dir, "/opt/mn");
        assert_eq!(c.indradb_dir, "/opt/idb");
        assert_eq!(c.ip, "10.0.0.1");
        assert_eq!(c.mocknet_port, 8080);
        assert_eq!(c.indradb_port, 8081);
        assert_eq!(c.server_check_port, 8082);
        assert_eq!(c.image, "debian:11");
        assert_eq!(c.config_file, "/opt/mn/cluster_config_template.json");
        assert!(init_help().contains("-mnp"));
    }

    #[test]
    fn config_file_follows_mocknet_dir() {
        let c = config("--mocknet_dir /opt/mocknet/");
        assert_eq!(c.config_file, "/opt/mocknet/cluster_config_template.json");

        let c = config("--mocknet_dir /opt/mocknet -c /etc/cluster.json");
        assert_eq!(c.config_file, "/etc/cluster.json");
    }

    #[test]
    fn bad_port_is_a_parse_error() {
        let err = parse_init_line("--mocknet_port 70000").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        let err = parse_init_line("--indradb_port abc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        let err = parse_init_line("--server_check_port -1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn unknown_flag_is_a_grammar_error() {
        let err = parse_init_line("--bogus 1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Grammar);
        let err = parse_init_line("--launch sometimes").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Grammar);
    }

    #[test]
    fn help_and_exit() {
        match parse_init_line("--help").unwrap() {
            InitLine::Help(text) => assert!(text.contains("--mocknet_port")),
            other => panic!("expected help, got {:?}", other),
        }
        assert_eq!(
            parse_init_line("-h").unwrap(),
            parse_init_line("--help").unwrap()
        );
        assert_eq!(parse_init_line("exit").unwrap(), InitLine::Exit);
        assert!(init_help().contains("--lenient-topology"));
    }
}
