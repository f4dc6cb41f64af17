use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::cli::{parse_init_line, CtlConfig, InitLine};
use crate::client::EmunetClient;
use crate::command::{Command, CommandParser};
use crate::errors::{CtlError, ErrorKind};
use crate::launcher::{launch_all, launch_plan};

pub const INIT_PROMPT: &str = "mocknet(initializing)> ";
pub const OP_PROMPT: &str = "mocknet> ";

const INIT_NOTES: [&str; 2] = [
    "*** note: input '-h' or '--help' to show these argument needed for initializing server, or 'exit' to quit",
    "*** note: ending input with no argument will set these as default value, it's recommended to comfirm them by 'help'",
];
const OP_NOTE: &str =
    "*** note: input '-h' or '--help' to show these subcommands for operation, or 'exit' to quit";

/// The interactive front end: reads lines from `input`, writes everything the
/// user should see to `out`.
pub struct Repl<R, W> {
    input: R,
    out: W,
}

impl<R, W> Repl<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    // print the prompt and wait for the next line, None on end of input.
    // bytes that are not UTF-8 are replaced, the grammar rejects the line later
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>, CtlError> {
        write!(self.out, "{}", prompt)?;
        self.out.flush()?;

        let mut buf = Vec::new();
        if self.input.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(None);
        }
        if buf.ends_with(b"\n") {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    fn report(&mut self, err: &CtlError) -> Result<(), CtlError> {
        match err {
            CtlError::Service { message } => writeln!(self.out, "error! the message is: {}", message)?,
            _ => writeln!(self.out, "{}", err)?,
        }
        Ok(())
    }

    /// Collect the startup configuration.
    ///
    /// Loops until a line parses. `exit` or end of input aborts startup.
    pub async fn initialize(&mut self) -> Result<CtlConfig, CtlError> {
        for note in INIT_NOTES.iter() {
            writeln!(self.out, "{}", note)?;
        }

        loop {
            let line = match self.read_line(INIT_PROMPT).await? {
                Some(line) => line,
                None => {
                    writeln!(self.out)?;
                    return Err(CtlError::StartupAborted);
                }
            };

            match parse_init_line(&line) {
                Ok(InitLine::Config(config)) => {
                    tracing::info!(?config, "configuration bound");
                    return Ok(config);
                }
                Ok(InitLine::Help(text)) => writeln!(self.out, "{}", text)?,
                Ok(InitLine::Exit) => return Err(CtlError::StartupAborted),
                Err(e) => self.report(&e)?,
            }
        }
    }

    /// Hand the configured services over to the launcher.
    pub async fn setup(&mut self, config: &CtlConfig) -> Result<(), CtlError> {
        let plan = launch_plan(config);
        for (service, err) in launch_all(&plan).await {
            writeln!(self.out, "*** fail to launch {}: {}", service, err)?;
        }
        writeln!(self.out, "*** successfully initialize the mocknet server")?;
        Ok(())
    }

    /// The operation loop. Returns once `exit` is typed or the input ends.
    ///
    /// Parse, grammar, transport and service errors are printed and the loop
    /// goes on; only a failure to talk to the terminal itself is returned.
    pub async fn run(&mut self, config: &CtlConfig) -> Result<(), CtlError> {
        let client = EmunetClient::new(config.service_url(), config.wire)?;
        let parser = CommandParser::new(config.grouping);

        writeln!(self.out, "{}", OP_NOTE)?;
        loop {
            let line = match self.read_line(OP_PROMPT).await? {
                Some(line) => line,
                None => {
                    writeln!(self.out)?;
                    return Ok(());
                }
            };

            let command = match parser.parse(&line) {
                Ok(Some(Command::Exit)) => return Ok(()),
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    self.report(&e)?;
                    continue;
                }
            };

            match dispatch(&client, &command).await {
                Ok(text) => writeln!(self.out, "{}", text)?,
                Err(e) => {
                    if e.kind() == ErrorKind::Transport {
                        tracing::warn!(error = %e, "request failed");
                    }
                    self.report(&e)?;
                }
            }
        }
    }
}

/// Send the request of one command and render the successful outcome.
pub async fn dispatch(client: &EmunetClient, command: &Command) -> Result<String, CtlError> {
    let text = match command {
        Command::Register { user } => {
            client.register_user(user).await?;
            format!("successfully register as '{}'", user)
        }
        Command::CreateEmunet {
            user,
            emunet,
            capacity,
        } => {
            let data = client.create_emunet(user, emunet, *capacity).await?;
            format!(
                "successfully create emunet named '{}' with user '{}' and capacity '{}', the UUID of emunet is: '{}'",
                emunet,
                user,
                capacity,
                plain(data.as_ref())
            )
        }
        Command::InitEmunet(topology) => {
            client.init_emunet(topology).await?;
            "successfully init the emunet, now it's working!".to_string()
        }
        Command::UpdateEmunet(topology) => {
            client.update_emunet(topology).await?;
            "successfully update the emunet, now it's working!".to_string()
        }
        Command::ListAll => pretty_json(client.list_all().await?),
        Command::ListForUser { user } => render_emunet_list(client.list_emunet(user).await?),
        Command::DeleteEmunet { uuid } => {
            client.delete_emunet(uuid).await?;
            format!("successfully delete emunet: {}", uuid)
        }
        Command::DeleteUser { user } => {
            client.delete_user(user).await?;
            format!("successfully delete user: {}", user)
        }
        Command::GetInfo { uuid } => pretty_json(client.get_emunet_info(uuid).await?),
        Command::GetState { uuid } => pretty_json(client.get_emunet_state(uuid).await?),
        Command::Help(text) => text.trim_end().to_string(),
        Command::Exit => String::new(),
    };
    Ok(text)
}

// strings are shown without their JSON quotes
fn plain(data: Option<&Value>) -> String {
    match data {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(sorted.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(values) => Value::Array(values.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

// 4-space indent and `"key":value` pairs, no space after the colon
struct ListingFormatter<'a> {
    inner: PrettyFormatter<'a>,
}

impl<'a> ListingFormatter<'a> {
    fn new() -> Self {
        Self {
            inner: PrettyFormatter::with_indent(b"    "),
        }
    }
}

impl<'a> Formatter for ListingFormatter<'a> {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b":")
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }
}

/// Render `data` as JSON with sorted keys, a 4-space indent and `"key":value`
/// pairs.
pub fn pretty_json(data: Option<Value>) -> String {
    let value = sort_keys(data.unwrap_or(Value::Null));
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, ListingFormatter::new());
    match value.serialize(&mut ser) {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => value.to_string(),
    }
}

/// One `name: <emunet>, uuid: <uuid>` line per emunet of the user.
pub fn render_emunet_list(data: Option<Value>) -> String {
    match data {
        Some(Value::Object(map)) => {
            let sorted: BTreeMap<String, Value> = map.into_iter().collect();
            sorted
                .iter()
                .map(|(name, uuid)| format!("name: {}, uuid: {}", name, plain(Some(uuid))))
                .collect::<Vec<String>>()
                .join("\n")
        }
        other => pretty_json(other),
    }
}
