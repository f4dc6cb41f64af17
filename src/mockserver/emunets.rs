use serde::Deserialize;
use warp::Filter;

use super::{EmunetState, MockService, Response};
use crate::topology::{Link, Node};

#[derive(Deserialize)]
struct CreateEmunet {
    user: String,
    emunet: String,
    capacity: u64,
}

#[derive(Deserialize)]
struct EmunetUuid {
    emunet_uuid: String,
}

#[derive(Deserialize)]
struct Topology {
    emunet_uuid: String,
    devs: Vec<Node>,
    links: Vec<Link>,
}

#[derive(serde::Serialize, Default)]
struct StateReport {
    emunet_uuid: String,
    state: Option<EmunetState>,
}

async fn handle_create(req: CreateEmunet, service: MockService) -> Result<warp::reply::Json, warp::Rejection> {
    let res = service
        .with(|reg| reg.create_emunet(&req.user, &req.emunet, req.capacity))
        .map(|uuid| uuid.to_string());
    tracing::info!(user = %req.user, emunet = %req.emunet, capacity = req.capacity, ok = res.is_ok(), "create_emunet");
    Ok(Response::from(res).into())
}

async fn handle_init(req: Topology, service: MockService) -> Result<warp::reply::Json, warp::Rejection> {
    let Topology {
        emunet_uuid,
        devs,
        links,
    } = req;
    let res = service
        .with(|reg| reg.init_emunet(&emunet_uuid, devs, links))
        .map(Some);
    tracing::info!(emunet = %emunet_uuid, ok = res.is_ok(), "init_emunet");
    Ok(Response::from(res).into())
}

async fn handle_update(req: Topology, service: MockService) -> Result<warp::reply::Json, warp::Rejection> {
    let Topology {
        emunet_uuid,
        devs,
        links,
    } = req;
    let res = service
        .with(|reg| reg.update_emunet(&emunet_uuid, devs, links))
        .map(Some);
    tracing::info!(emunet = %emunet_uuid, ok = res.is_ok(), "update_emunet");
    Ok(Response::from(res).into())
}

async fn handle_delete(req: EmunetUuid, service: MockService) -> Result<warp::reply::Json, warp::Rejection> {
    let res = service.with(|reg| reg.delete_emunet(&req.emunet_uuid));
    tracing::info!(emunet = %req.emunet_uuid, ok = res.is_ok(), "delete_emunet");
    Ok(Response::from(res).into())
}

async fn handle_info(req: EmunetUuid, service: MockService) -> Result<warp::reply::Json, warp::Rejection> {
    let res = service.with(|reg| reg.emunet_info(&req.emunet_uuid)).map(Some);
    Ok(Response::from(res).into())
}

async fn handle_state(req: EmunetUuid, service: MockService) -> Result<warp::reply::Json, warp::Rejection> {
    let res = service
        .with(|reg| reg.emunet_state(&req.emunet_uuid))
        .map(|state| StateReport {
            emunet_uuid: req.emunet_uuid.clone(),
            state: Some(state),
        });
    Ok(Response::from(res).into())
}

pub(super) fn create_emunet(
    service: MockService,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone + Send {
    super::filter_template("create_emunet", service, handle_create)
}

pub(super) fn init_emunet(
    service: MockService,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone + Send {
    super::filter_template("init_emunet", service, handle_init)
}

pub(super) fn update_emunet(
    service: MockService,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone + Send {
    super::filter_template("update_emunet", service, handle_update)
}

pub(super) fn delete_emunet(
    service: MockService,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone + Send {
    super::filter_template("delete_emunet", service, handle_delete)
}

pub(super) fn get_emunet_info(
    service: MockService,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone + Send {
    super::filter_template("get_emunet_info", service, handle_info)
}

pub(super) fn get_emunet_state(
    service: MockService,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone + Send {
    super::filter_template("get_emunet_state", service, handle_state)
}
