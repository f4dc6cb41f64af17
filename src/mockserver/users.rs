use serde::Deserialize;
use warp::Filter;

use super::{MockService, Response};

#[derive(Deserialize)]
struct UserName {
    name: String,
}

#[derive(Deserialize)]
struct ListEmunet {
    user: String,
}

async fn handle_register(req: UserName, service: MockService) -> Result<warp::reply::Json, warp::Rejection> {
    let res = service.with(|reg| reg.register_user(&req.name));
    tracing::info!(user = %req.name, ok = res.is_ok(), "register_user");
    Ok(Response::from(res).into())
}

// the user must not own any emunet
async fn handle_delete(req: UserName, service: MockService) -> Result<warp::reply::Json, warp::Rejection> {
    let res = service.with(|reg| reg.delete_user(&req.name));
    tracing::info!(user = %req.name, ok = res.is_ok(), "delete_user");
    Ok(Response::from(res).into())
}

async fn handle_list_emunet(req: ListEmunet, service: MockService) -> Result<warp::reply::Json, warp::Rejection> {
    let res = service.with(|reg| reg.list_emunet(&req.user));
    Ok(Response::from(res).into())
}

async fn handle_list_all(service: MockService) -> Result<warp::reply::Json, warp::Rejection> {
    let inventory = service.with(|reg| reg.list_all());
    Ok(Response::success(inventory).into())
}

pub(super) fn register_user(
    service: MockService,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone + Send {
    super::filter_template("register_user", service, handle_register)
}

pub(super) fn delete_user(
    service: MockService,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone + Send {
    super::filter_template("delete_user", service, handle_delete)
}

pub(super) fn list_emunet(
    service: MockService,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone + Send {
    super::filter_template("list_emunet", service, handle_list_emunet)
}

// list_all is the only path that carries no body
pub(super) fn list_all(
    service: MockService,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone + Send {
    warp::post()
        .and(warp::path("v1"))
        .and(warp::path("list_all"))
        .and(warp::path::end())
        .and(super::with_service(service))
        .and_then(handle_list_all)
}
