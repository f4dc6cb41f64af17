// An in-memory stand-in for the emunet REST service. It answers every /v1/
// path with the same {success, data, message} envelope as the real server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde::{de::DeserializeOwned, Serialize};
use warp::Filter;

mod emunets;
mod registry;
mod users;

pub use registry::{Emunet, EmunetState, Inventory, Registry};

fn parse_json_body<T: DeserializeOwned + Send>(
) -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(1024 * 16).and(warp::body::json())
}

#[derive(Serialize)]
struct Response<T: Serialize + Default> {
    success: bool,
    data: T,
    message: String,
}

impl<T: Serialize + Default> Response<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            message: String::new(),
        }
    }

    fn fail(err_msg: String) -> Self {
        Self {
            success: false,
            data: T::default(),
            message: err_msg,
        }
    }
}

impl<T: Serialize + Default> From<Result<T, String>> for Response<T> {
    fn from(res: Result<T, String>) -> Self {
        match res {
            Ok(data) => Response::success(data),
            Err(msg) => Response::fail(msg),
        }
    }
}

impl<T: Serialize + Default> From<Response<T>> for warp::reply::Json {
    fn from(resp: Response<T>) -> Self {
        warp::reply::json(&resp)
    }
}

/// Shared handle on the registry, cloned into every filter.
#[derive(Clone, Debug)]
pub struct MockService {
    registry: Arc<Mutex<Registry>>,
}

impl MockService {
    pub fn new(capacity: u64) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::new(capacity))),
        }
    }

    /// Run `f` with exclusive access to the registry.
    pub fn with<T, F: FnOnce(&mut Registry) -> T>(&self, f: F) -> T {
        // a panicking handler leaves the registry consistent, every
        // operation validates before it mutates
        let mut guard = self
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

fn with_service(
    service: MockService,
) -> impl Filter<Extract = (MockService,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || service.clone())
}

fn filter_template<Req, F, R>(
    api_path: &'static str,
    service: MockService,
    handle: F,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone + Send
where
    Req: DeserializeOwned + Send,
    F: Fn(Req, MockService) -> R + Send + Sync + Clone,
    R: Future<Output = Result<warp::reply::Json, warp::Rejection>> + Send,
{
    warp::post()
        .and(warp::path("v1"))
        .and(warp::path(api_path))
        .and(warp::path::end())
        .and(parse_json_body())
        .and(with_service(service))
        .and_then(handle)
}

/// Every path of the emunet API served by `service`.
pub fn routes(
    service: MockService,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone + Send + Sync + 'static
{
    users::register_user(service.clone())
        .or(users::delete_user(service.clone()))
        .or(users::list_emunet(service.clone()))
        .or(users::list_all(service.clone()))
        .or(emunets::create_emunet(service.clone()))
        .or(emunets::init_emunet(service.clone()))
        .or(emunets::update_emunet(service.clone()))
        .or(emunets::delete_emunet(service.clone()))
        .or(emunets::get_emunet_info(service.clone()))
        .or(emunets::get_emunet_state(service))
}

/// Bind the routes of `service` to `addr`; port 0 picks a free port.
pub fn bind(service: MockService, addr: SocketAddr) -> (SocketAddr, impl Future<Output = ()> + 'static) {
    warp::serve(routes(service)).bind_ephemeral(addr)
}
