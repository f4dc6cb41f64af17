use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::topology::{Link, Node};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmunetState {
    Uninit,
    Normal,
}

#[derive(Serialize, Clone, Debug)]
pub struct Emunet {
    emunet_name: String,
    emunet_uuid: Uuid,
    user_name: String,
    max_capacity: u64,
    state: EmunetState,
    devs: Vec<Node>,
    links: Vec<Link>,
}

impl Emunet {
    pub fn state(&self) -> EmunetState {
        self.state
    }

    pub fn devs(&self) -> &[Node] {
        &self.devs
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }
}

#[derive(Serialize, Debug, Default)]
pub struct Inventory {
    users: BTreeMap<String, BTreeMap<String, Emunet>>,
    remaining_capacity: u64,
}

/// In-memory bookkeeping of users and their emunets.
///
/// Every operation either applies completely or returns the message that is
/// sent back to the client.
#[derive(Debug)]
pub struct Registry {
    // user name -> (emunet name -> emunet uuid)
    users: BTreeMap<String, BTreeMap<String, Uuid>>,
    emunets: HashMap<Uuid, Emunet>,
    remaining_capacity: u64,
}

fn parse_uuid(raw: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw).map_err(|_| format!("invalid emunet uuid {}", raw))
}

// node ids must be unique, links must connect known nodes and appear once
// in either direction
fn check_graph(devs: &[Node], links: &[Link]) -> Result<(), String> {
    let mut ids = HashSet::new();
    for dev in devs.iter() {
        if !ids.insert(dev.id()) {
            return Err(format!("invalid input graph: repeated node id {}", dev.id()));
        }
    }

    let mut edges = HashSet::new();
    for link in links.iter() {
        let (src, dst) = link.endpoints();
        if !ids.contains(&src) || !ids.contains(&dst) {
            return Err(format!(
                "invalid input graph: link ({}, {}) connects an unknown node",
                src, dst
            ));
        }
        if edges.contains(&(dst, src)) || !edges.insert((src, dst)) {
            return Err(format!("invalid input graph: repeated link ({}, {})", src, dst));
        }
    }
    Ok(())
}

impl Registry {
    pub fn new(capacity: u64) -> Self {
        Self {
            users: BTreeMap::new(),
            emunets: HashMap::new(),
            remaining_capacity: capacity,
        }
    }

    pub fn remaining_capacity(&self) -> u64 {
        self.remaining_capacity
    }

    pub fn register_user(&mut self, name: &str) -> Result<(), String> {
        if name.is_empty() {
            return Err("invalid user name".to_string());
        }
        if self.users.contains_key(name) {
            return Err(format!("user {} has already registered", name));
        }
        self.users.insert(name.to_string(), BTreeMap::new());
        Ok(())
    }

    pub fn delete_user(&mut self, name: &str) -> Result<(), String> {
        match self.users.get(name) {
            None => Err(format!("user {} does not exist", name)),
            Some(emunets) if !emunets.is_empty() => {
                Err(format!("user {} still has {} emunet(s)", name, emunets.len()))
            }
            Some(_) => {
                self.users.remove(name);
                Ok(())
            }
        }
    }

    pub fn create_emunet(&mut self, user: &str, emunet: &str, capacity: u64) -> Result<Uuid, String> {
        let remaining = self.remaining_capacity;
        let emunets = self
            .users
            .get_mut(user)
            .ok_or_else(|| "invalid user name".to_string())?;
        if emunets.contains_key(emunet) {
            return Err(format!("invalid emunet name {}", emunet));
        }
        if capacity == 0 || capacity > remaining {
            return Err(format!(
                "not enough capacity at backend, remaining capacity: {}",
                remaining
            ));
        }

        let emunet_uuid = Uuid::new_v4();
        emunets.insert(emunet.to_string(), emunet_uuid);
        self.emunets.insert(
            emunet_uuid,
            Emunet {
                emunet_name: emunet.to_string(),
                emunet_uuid,
                user_name: user.to_string(),
                max_capacity: capacity,
                state: EmunetState::Uninit,
                devs: Vec::new(),
                links: Vec::new(),
            },
        );
        self.remaining_capacity -= capacity;
        Ok(emunet_uuid)
    }

    fn emunet_mut(&mut self, raw: &str) -> Result<&mut Emunet, String> {
        let uuid = parse_uuid(raw)?;
        self.emunets
            .get_mut(&uuid)
            .ok_or_else(|| format!("emunet {} does not exist", raw))
    }

    fn emunet(&self, raw: &str) -> Result<&Emunet, String> {
        let uuid = parse_uuid(raw)?;
        self.emunets
            .get(&uuid)
            .ok_or_else(|| format!("emunet {} does not exist", raw))
    }

    fn install(emunet: &mut Emunet, devs: Vec<Node>, links: Vec<Link>) -> Result<(), String> {
        check_graph(&devs, &links)?;
        if devs.len() as u64 > emunet.max_capacity {
            return Err("input graph exceeds capacity limitation".to_string());
        }
        emunet.devs = devs;
        emunet.links = links;
        emunet.state = EmunetState::Normal;
        Ok(())
    }

    pub fn init_emunet(
        &mut self,
        raw: &str,
        devs: Vec<Node>,
        links: Vec<Link>,
    ) -> Result<EmunetState, String> {
        let emunet = self.emunet_mut(raw)?;
        if emunet.state != EmunetState::Uninit {
            return Err(format!("emunet {} is already initialized", raw));
        }
        Self::install(emunet, devs, links)?;
        Ok(emunet.state)
    }

    pub fn update_emunet(
        &mut self,
        raw: &str,
        devs: Vec<Node>,
        links: Vec<Link>,
    ) -> Result<EmunetState, String> {
        let emunet = self.emunet_mut(raw)?;
        if emunet.state != EmunetState::Normal {
            return Err(format!("emunet {} is not in normal state", raw));
        }
        Self::install(emunet, devs, links)?;
        Ok(emunet.state)
    }

    pub fn delete_emunet(&mut self, raw: &str) -> Result<(), String> {
        let uuid = parse_uuid(raw)?;
        let emunet = self
            .emunets
            .remove(&uuid)
            .ok_or_else(|| format!("emunet {} does not exist", raw))?;
        if let Some(emunets) = self.users.get_mut(&emunet.user_name) {
            emunets.remove(&emunet.emunet_name);
        }
        self.remaining_capacity += emunet.max_capacity;
        Ok(())
    }

    pub fn emunet_info(&self, raw: &str) -> Result<Emunet, String> {
        self.emunet(raw).map(|emunet| emunet.clone())
    }

    pub fn emunet_state(&self, raw: &str) -> Result<EmunetState, String> {
        self.emunet(raw).map(|emunet| emunet.state)
    }

    pub fn list_emunet(&self, user: &str) -> Result<BTreeMap<String, Uuid>, String> {
        self.users
            .get(user)
            .cloned()
            .ok_or_else(|| format!("user {} does not exist", user))
    }

    pub fn list_all(&self) -> Inventory {
        let users = self
            .users
            .iter()
            .map(|(user, emunets)| {
                let emunets = emunets
                    .iter()
                    .filter_map(|(name, uuid)| {
                        self.emunets.get(uuid).map(|e| (name.clone(), e.clone()))
                    })
                    .collect();
                (user.clone(), emunets)
            })
            .collect();
        Inventory {
            users,
            remaining_capacity: self.remaining_capacity,
        }
    }
}
