use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use warp::Filter;

use mnctl::cli::CtlConfig;
use mnctl::client::WireFormat;
use mnctl::mockserver::{self, EmunetState, MockService};
use mnctl::repl::Repl;

type Recorded = Arc<Mutex<Vec<(String, Value)>>>;

fn config_for(addr: SocketAddr) -> CtlConfig {
    CtlConfig {
        ip: addr.ip().to_string(),
        mocknet_port: addr.port(),
        ..CtlConfig::default()
    }
}

fn start_mock(capacity: u64) -> (MockService, CtlConfig) {
    let service = MockService::new(capacity);
    let (addr, server) = mockserver::bind(service.clone(), ([127, 0, 0, 1], 0).into());
    tokio::spawn(server);
    (service, config_for(addr))
}

// answers every /v1/<path> with responder(path) and keeps the decoded request bodies
fn recording_server(responder: fn(&str) -> String) -> (Recorded, CtlConfig) {
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let log = recorded.clone();
    let route = warp::post()
        .and(warp::path("v1"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::body::bytes())
        .map(move |path: String, body: warp::hyper::body::Bytes| {
            let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
            log.lock().unwrap().push((path.clone(), body));
            responder(&path)
        });
    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (recorded, config_for(addr))
}

fn always_ok(_: &str) -> String {
    json!({"success": true, "data": "working", "message": ""}).to_string()
}

async fn session(config: &CtlConfig, input: &str) -> String {
    let mut repl = Repl::new(input.as_bytes(), Vec::new());
    repl.run(config).await.unwrap();
    String::from_utf8(repl.into_output()).unwrap()
}

#[tokio::test]
async fn register_user() {
    let (service, config) = start_mock(10);
    let out = session(&config, "register -n alice\nexit\n").await;
    assert!(out.contains("successfully register as 'alice'"));
    assert!(service.with(|reg| reg.list_emunet("alice")).is_ok());
}

#[tokio::test]
async fn service_failure_is_printed_verbatim() {
    fn quota(_: &str) -> String {
        json!({"success": false, "data": null, "message": "capacity exceeds quota"}).to_string()
    }
    let (recorded, config) = recording_server(quota);

    let out = session(&config, "netcrt -u alice -n testnet -c 5\n").await;
    assert!(out.contains("error! the message is: capacity exceeds quota"));

    let recorded = recorded.lock().unwrap();
    assert_eq!(
        *recorded,
        vec![(
            "create_emunet".to_string(),
            json!({"user": "alice", "emunet": "testnet", "capacity": 5})
        )]
    );
}

#[tokio::test]
async fn netinit_sends_the_descriptor() {
    let (recorded, config) = recording_server(always_ok);

    let out = session(
        &config,
        "netinit --uuid abc-123 --nodes 1 hostA 2 hostB --links 1 2 link1\n",
    )
    .await;
    assert!(out.contains("successfully init the emunet"));

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, "init_emunet");
    assert_eq!(
        recorded[0].1,
        json!({
            "emunet_uuid": "abc-123",
            "devs": [
                {"id": 1, "description": "hostA"},
                {"id": 2, "description": "hostB"}
            ],
            "links": [
                {"edge_id": [1, 2], "description": "link1"}
            ]
        })
    );
}

#[tokio::test]
async fn local_errors_send_nothing() {
    let (recorded, config) = recording_server(always_ok);

    let out = session(
        &config,
        "netinit --uuid u --nodes 1 a 2 --links 1 2 x\nnetcrt -u a -n b -c many\nnetdel\nbogus\n",
    )
    .await;
    assert!(out.contains("parse error"));
    assert!(out.contains("grammar error"));
    assert!(recorded.lock().unwrap().is_empty());
}

#[tokio::test]
async fn transport_error_does_not_end_the_session() {
    fn garbage_for_list_all(path: &str) -> String {
        if path == "list_all" {
            "<html>502 bad gateway</html>".to_string()
        } else {
            always_ok(path)
        }
    }
    let (recorded, config) = recording_server(garbage_for_list_all);

    let out = session(&config, "listall\nregister -n bob\n").await;
    assert!(out.contains("transport error"));
    assert!(out.contains("successfully register as 'bob'"));

    let recorded = recorded.lock().unwrap();
    // list_all carries no body
    assert_eq!(recorded[0], ("list_all".to_string(), Value::Null));
    assert_eq!(recorded[1], ("register_user".to_string(), json!({"name": "bob"})));
}

#[tokio::test]
async fn unreachable_service() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = CtlConfig {
        mocknet_port: port,
        ..CtlConfig::default()
    };

    let out = session(&config, "listall\nnetstat -u x\nexit\n").await;
    assert_eq!(out.matches("transport error").count(), 2);
}

// output sink that the test can read while the session is still running
#[derive(Clone, Default)]
struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn session_recovers_once_the_service_comes_up() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = CtlConfig {
        mocknet_port: port,
        ..CtlConfig::default()
    };

    let (mut keyboard, terminal) = tokio::io::duplex(1024);
    let output = SharedOutput::default();
    let mut repl = Repl::new(tokio::io::BufReader::new(terminal), output.clone());
    let running = tokio::spawn(async move { repl.run(&config).await });

    keyboard.write_all(b"register -n frank\n").await.unwrap();
    for _ in 0..500 {
        if output.text().contains("transport error") {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(output.text().contains("transport error"));

    // the same address now answers
    let service = MockService::new(10);
    let (_, server) = mockserver::bind(service.clone(), ([127, 0, 0, 1], port).into());
    tokio::spawn(server);

    keyboard.write_all(b"register -n frank\nexit\n").await.unwrap();
    running.await.unwrap().unwrap();

    let out = output.text();
    assert_eq!(out.matches("transport error").count(), 1);
    assert!(out.contains("successfully register as 'frank'"));
    assert!(service.with(|reg| reg.list_emunet("frank")).is_ok());
}

#[tokio::test]
async fn exit_stops_reading() {
    let (service, config) = start_mock(10);
    let out = session(&config, "exit\nregister -n bob\n").await;
    assert!(!out.contains("bob"));
    assert!(service.with(|reg| reg.list_emunet("bob")).is_err());
}

#[tokio::test]
async fn end_of_input_ends_the_session() {
    let (service, config) = start_mock(10);
    // the last line has no newline and there is no exit
    session(&config, "register -n carol").await;
    assert!(service.with(|reg| reg.list_emunet("carol")).is_ok());
}

#[tokio::test]
async fn legacy_wire_format() {
    let (recorded, config) = recording_server(always_ok);
    let config = CtlConfig {
        wire: WireFormat::Legacy,
        ..config
    };

    session(&config, "netdel -u u-1\nusrdel -n alice\nnetinfo -u u-1\n").await;
    let recorded = recorded.lock().unwrap();
    assert_eq!(
        *recorded,
        vec![
            ("delete_emunet".to_string(), json!({"name": "u-1"})),
            ("delete_user".to_string(), json!({"uuid": "alice"})),
            ("get_emunet_info".to_string(), json!({"emunet_uuid": "u-1"})),
        ]
    );
}

#[tokio::test]
async fn emunet_lifecycle() {
    let (service, config) = start_mock(10);

    let out = session(&config, "register -n alice\nnetcrt -u alice -n net1 -c 4\n").await;
    let uuid = service
        .with(|reg| reg.list_emunet("alice"))
        .unwrap()
        .get("net1")
        .cloned()
        .unwrap()
        .to_string();
    assert!(out.contains(&format!(
        "successfully create emunet named 'net1' with user 'alice' and capacity '4', the UUID of emunet is: '{}'",
        uuid
    )));

    let input = format!(
        "netupdate --uuid {u} --nodes 1 a --links 1 1 loop\n\
         netinit --uuid {u} --nodes 1 a 2 b 3 c --links 1 2 l1 2 3 l2\n\
         netstat -u {u}\n\
         netupdate --uuid {u} --nodes 1 a 2 b --links 1 2 l1\n\
         netinfo -u {u}\n\
         netlist -u alice\n\
         usrdel -n alice\n\
         listall\n\
         netdel -u {u}\n\
         usrdel -n alice\n\
         exit\n",
        u = uuid
    );
    let out = session(&config, &input).await;

    // update is refused until the emunet is initialized
    assert!(out.contains(&format!(
        "error! the message is: emunet {} is not in normal state",
        uuid
    )));
    assert!(out.contains("successfully init the emunet, now it's working!"));
    assert!(out.contains("\"state\":\"Normal\""));
    assert!(out.contains("successfully update the emunet, now it's working!"));
    assert!(out.contains("\"emunet_name\":\"net1\""));
    assert!(out.contains(&format!("name: net1, uuid: {}", uuid)));
    assert!(out.contains("error! the message is: user alice still has 1 emunet(s)"));
    assert!(out.contains("\"remaining_capacity\":6"));
    assert!(out.contains(&format!("successfully delete emunet: {}", uuid)));
    assert!(out.contains("successfully delete user: alice"));

    service.with(|reg| {
        assert_eq!(reg.remaining_capacity(), 10);
        assert!(reg.emunet_state(&uuid).is_err());
    });
}

#[tokio::test]
async fn state_after_init() {
    let (service, config) = start_mock(4);
    session(&config, "register -n eve\nnetcrt -u eve -n lab -c 2\n").await;
    let uuid = service.with(|reg| reg.list_emunet("eve")).unwrap()["lab"].to_string();

    session(
        &config,
        &format!("netinit --uuid {} --nodes 7 r1 9 r2 --links 9 7 wire\n", uuid),
    )
    .await;
    service.with(|reg| {
        assert_eq!(reg.emunet_state(&uuid).unwrap(), EmunetState::Normal);
        let info = reg.emunet_info(&uuid).unwrap();
        assert_eq!(info.links()[0].endpoints(), (9, 7));
    });
}

#[tokio::test]
async fn whole_program_flow() {
    let (service, config) = start_mock(10);
    let input = format!(
        "--bogus\n-i {} --mocknet_port {}\nregister -n dave\nexit\n",
        config.ip, config.mocknet_port
    );

    let mut repl = Repl::new(input.as_bytes(), Vec::new());
    let bound = repl.initialize().await.unwrap();
    assert_eq!(bound.service_url(), config.service_url());
    repl.setup(&bound).await.unwrap();
    repl.run(&bound).await.unwrap();

    let out = String::from_utf8(repl.into_output()).unwrap();
    assert!(out.contains("grammar error"));
    assert!(out.contains("*** successfully initialize the mocknet server"));
    assert!(out.contains("successfully register as 'dave'"));
    assert!(service.with(|reg| reg.list_emunet("dave")).is_ok());
}
