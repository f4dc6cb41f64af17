use clap::{App, AppSettings, Arg, ArgMatches, ErrorKind as ClapErrorKind, SubCommand};

use crate::cli::first_line;
use crate::errors::CtlError;
use crate::topology::{GroupingPolicy, TopologyBuilder, TopologyDescriptor};

/// One line typed at the `mocknet>` prompt, after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register { user: String },
    CreateEmunet { user: String, emunet: String, capacity: u64 },
    InitEmunet(TopologyDescriptor),
    UpdateEmunet(TopologyDescriptor),
    ListAll,
    ListForUser { user: String },
    DeleteEmunet { uuid: String },
    DeleteUser { user: String },
    GetInfo { uuid: String },
    GetState { uuid: String },
    Exit,
    Help(String),
}

fn uuid_arg(help: &'static str) -> Arg<'static, 'static> {
    Arg::with_name("uuid")
        .short("u")
        .long("uuid")
        .value_name("UUID")
        .takes_value(true)
        .required(true)
        .help(help)
}

fn topology_subcommand(name: &'static str, about: &'static str) -> App<'static, 'static> {
    SubCommand::with_name(name)
        .about(about)
        .arg(
            Arg::with_name("emunet_uuid")
                .long("uuid")
                .value_name("UUID")
                .takes_value(true)
                .required(true)
                .help("the uuid of the emunet"),
        )
        .arg(
            Arg::with_name("nodes")
                .long("nodes")
                .value_name("ID DESCRIPTION")
                .takes_value(true)
                .multiple(true)
                .required(true)
                .help("the nodes of the emunet, as repeated ID DESCRIPTION pairs"),
        )
        .arg(
            Arg::with_name("links")
                .long("links")
                .value_name("ID1 ID2 DESCRIPTION")
                .takes_value(true)
                .multiple(true)
                .required(true)
                .help("the links of the emunet, as repeated ID1 ID2 DESCRIPTION triples"),
        )
}

fn build_op_parser() -> App<'static, 'static> {
    App::new("mocknet")
        .about("Process the operation command")
        .after_help("[SUBCOMMAND] -h to get its help, 'exit' to quit")
        .setting(AppSettings::NoBinaryName)
        .setting(AppSettings::SubcommandRequired)
        .setting(AppSettings::DisableVersion)
        .setting(AppSettings::DisableHelpSubcommand)
        .setting(AppSettings::VersionlessSubcommands)
        .setting(AppSettings::ColorNever)
        // `-c -5` or `--nodes -1 a` reach the value checks instead of being read as flags
        .global_setting(AppSettings::AllowNegativeNumbers)
        .subcommand(
            SubCommand::with_name("register")
                .about("register as a user")
                .arg(
                    Arg::with_name("user_name")
                        .short("n")
                        .long("user_name")
                        .value_name("NAME")
                        .takes_value(true)
                        .required(true)
                        .help("the name you want to register in the server"),
                ),
        )
        .subcommand(
            SubCommand::with_name("netcrt")
                .about("create a emunet under a user with specified capacity")
                .arg(
                    Arg::with_name("user_name")
                        .short("u")
                        .long("user")
                        .value_name("USER")
                        .takes_value(true)
                        .required(true)
                        .help("the user name that you want to create emunet for"),
                )
                .arg(
                    Arg::with_name("net_name")
                        .short("n")
                        .long("net")
                        .value_name("NET")
                        .takes_value(true)
                        .required(true)
                        .help("the emunet name that you want to create"),
                )
                .arg(
                    Arg::with_name("capacity")
                        .short("c")
                        .long("capacity")
                        .value_name("CAPACITY")
                        .takes_value(true)
                        .required(true)
                        .help("the emunet capacity that you want to create"),
                ),
        )
        .subcommand(topology_subcommand("netinit", "initialize a emunet"))
        .subcommand(topology_subcommand(
            "netupdate",
            "update a emunet's nodes and links",
        ))
        .subcommand(SubCommand::with_name("listall").about("get the global information"))
        .subcommand(
            SubCommand::with_name("netlist")
                .about("get emunet list of a user")
                .arg(
                    Arg::with_name("user_name")
                        .short("u")
                        .long("user")
                        .value_name("USER")
                        .takes_value(true)
                        .required(true)
                        .help("the user name that you want to list out"),
                ),
        )
        .subcommand(
            SubCommand::with_name("netdel")
                .about("delete a emunet")
                .arg(uuid_arg("the uuid of emunet that you want to delete")),
        )
        .subcommand(
            SubCommand::with_name("usrdel")
                .about("delete a user")
                .arg(
                    Arg::with_name("name")
                        .short("n")
                        .long("name")
                        .value_name("NAME")
                        .takes_value(true)
                        .required(true)
                        .help("the user name you want to delete"),
                ),
        )
        .subcommand(
            SubCommand::with_name("netinfo")
                .about("get information of a emunet")
                .arg(uuid_arg("the emunet uuid you want to get information for")),
        )
        .subcommand(
            SubCommand::with_name("netstat")
                .about("get state of a emunet")
                .arg(uuid_arg("the emunet uuid you want to get state for")),
        )
}

/// Help text listing every operation.
pub fn op_help() -> String {
    let mut buf = Vec::new();
    // writing into a Vec can not fail
    let _ = build_op_parser().write_help(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Turns input lines into commands.
///
/// The parser holds no state besides the topology grouping policy, so
/// parsing the same line twice always gives the same result.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandParser {
    builder: TopologyBuilder,
}

impl CommandParser {
    pub fn new(policy: GroupingPolicy) -> Self {
        Self {
            builder: TopologyBuilder::new(policy),
        }
    }

    /// Parse one line. `Ok(None)` means there is nothing to do (blank line).
    pub fn parse(&self, line: &str) -> Result<Option<Command>, CtlError> {
        if line == "exit" {
            return Ok(Some(Command::Exit));
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            [] => return Ok(None),
            ["help"] | ["-h"] | ["--help"] => return Ok(Some(Command::Help(op_help()))),
            ["exit", ..] => return Err(CtlError::grammar("exit takes no arguments")),
            _ => {}
        }

        let matches = match build_op_parser().get_matches_from_safe(tokens) {
            Ok(matches) => matches,
            Err(e) if e.kind == ClapErrorKind::HelpDisplayed => {
                return Ok(Some(Command::Help(e.message)))
            }
            Err(e) => return Err(CtlError::grammar(first_line(&e.message))),
        };

        let command = match matches.subcommand() {
            ("register", Some(sub)) => Command::Register {
                user: value(sub, "user_name")?,
            },
            ("netcrt", Some(sub)) => Command::CreateEmunet {
                user: value(sub, "user_name")?,
                emunet: value(sub, "net_name")?,
                capacity: capacity(sub)?,
            },
            ("netinit", Some(sub)) => Command::InitEmunet(self.topology(sub)?),
            ("netupdate", Some(sub)) => Command::UpdateEmunet(self.topology(sub)?),
            ("listall", _) => Command::ListAll,
            ("netlist", Some(sub)) => Command::ListForUser {
                user: value(sub, "user_name")?,
            },
            ("netdel", Some(sub)) => Command::DeleteEmunet {
                uuid: value(sub, "uuid")?,
            },
            ("usrdel", Some(sub)) => Command::DeleteUser {
                user: value(sub, "name")?,
            },
            ("netinfo", Some(sub)) => Command::GetInfo {
                uuid: value(sub, "uuid")?,
            },
            ("netstat", Some(sub)) => Command::GetState {
                uuid: value(sub, "uuid")?,
            },
            (other, _) => return Err(CtlError::grammar(format!("unknown operation '{}'", other))),
        };
        Ok(Some(command))
    }

    fn topology(&self, sub: &ArgMatches<'_>) -> Result<TopologyDescriptor, CtlError> {
        let emunet_uuid = value(sub, "emunet_uuid")?;
        let nodes = values(sub, "nodes");
        let links = values(sub, "links");
        self.builder.build(&emunet_uuid, &nodes, &links)
    }
}

fn value(sub: &ArgMatches<'_>, name: &str) -> Result<String, CtlError> {
    sub.value_of(name)
        .map(|s| s.to_string())
        .ok_or_else(|| CtlError::grammar(format!("missing required parameter {}", name)))
}

fn values<'a>(sub: &'a ArgMatches<'a>, name: &str) -> Vec<&'a str> {
    sub.values_of(name).map(|v| v.collect()).unwrap_or_default()
}

fn capacity(sub: &ArgMatches<'_>) -> Result<u64, CtlError> {
    let raw = value(sub, "capacity")?;
    raw.parse::<u64>().map_err(|_| {
        CtlError::parse(format!(
            "invalid capacity '{}': expected a non-negative integer",
            raw
        ))
    })
}
