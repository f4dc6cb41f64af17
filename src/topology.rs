use serde::{Deserialize, Serialize};

use crate::errors::CtlError;

const NODE_GROUP: usize = 2; // id, description
const LINK_GROUP: usize = 3; // endpoint, endpoint, description

// Node is serialized into the `devs` list of an init/update request
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: u64,
    description: String,
}

impl Node {
    pub fn new<S: Into<String>>(id: u64, description: S) -> Self {
        Self {
            id,
            description: description.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

// Link represents an undirected edge between two node ids,
// serialized as `{"edge_id": [a, b], "description": ...}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Link {
    edge_id: (u64, u64),
    description: String,
}

impl Link {
    pub fn new<S: Into<String>>(source: u64, destination: u64, description: S) -> Self {
        Self {
            edge_id: (source, destination),
            description: description.into(),
        }
    }

    pub fn endpoints(&self) -> (u64, u64) {
        self.edge_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// The body of an `init_emunet` / `update_emunet` request.
///
/// Only the builder creates descriptors, and nothing mutates one afterwards.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TopologyDescriptor {
    emunet_uuid: String,
    #[serde(rename = "devs")]
    nodes: Vec<Node>,
    links: Vec<Link>,
}

impl TopologyDescriptor {
    pub fn emunet_uuid(&self) -> &str {
        &self.emunet_uuid
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }
}

/// What to do with a trailing group that is missing tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingPolicy {
    /// Reject the whole command with a parse error.
    Strict,
    /// Drop the incomplete trailing group and keep going.
    Lenient,
}

impl Default for GroupingPolicy {
    fn default() -> Self {
        GroupingPolicy::Strict
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopologyBuilder {
    policy: GroupingPolicy,
}

impl TopologyBuilder {
    pub fn new(policy: GroupingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> GroupingPolicy {
        self.policy
    }

    pub fn build<S: AsRef<str>>(
        &self,
        emunet_uuid: &str,
        node_tokens: &[S],
        link_tokens: &[S],
    ) -> Result<TopologyDescriptor, CtlError> {
        Ok(TopologyDescriptor {
            emunet_uuid: emunet_uuid.to_string(),
            nodes: self.nodes(node_tokens)?,
            links: self.links(link_tokens)?,
        })
    }

    pub fn nodes<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<Node>, CtlError> {
        self.groups(tokens, NODE_GROUP, "nodes")?
            .map(|group| -> Result<Node, CtlError> {
                let id = parse_id(group[0].as_ref(), "node id")?;
                Ok(Node::new(id, group[1].as_ref()))
            })
            .collect()
    }

    pub fn links<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<Link>, CtlError> {
        self.groups(tokens, LINK_GROUP, "links")?
            .map(|group| -> Result<Link, CtlError> {
                let source = parse_id(group[0].as_ref(), "link endpoint")?;
                let destination = parse_id(group[1].as_ref(), "link endpoint")?;
                Ok(Link::new(source, destination, group[2].as_ref()))
            })
            .collect()
    }

    // split the tokens into complete groups, applying the grouping policy to the remainder
    fn groups<'a, S: AsRef<str>>(
        &self,
        tokens: &'a [S],
        size: usize,
        what: &str,
    ) -> Result<std::slice::ChunksExact<'a, S>, CtlError> {
        let chunks = tokens.chunks_exact(size);
        let remainder = chunks.remainder();
        if !remainder.is_empty() {
            let dangling: Vec<&str> = remainder.iter().map(|s| s.as_ref()).collect();
            match self.policy {
                GroupingPolicy::Strict => {
                    return Err(CtlError::parse(format!(
                        "{} expects groups of {} tokens, dangling tokens: {}",
                        what,
                        size,
                        dangling.join(" ")
                    )));
                }
                GroupingPolicy::Lenient => {
                    tracing::warn!(what, dangling = %dangling.join(" "), "dropping incomplete trailing group");
                }
            }
        }
        Ok(chunks)
    }
}

fn parse_id(token: &str, what: &str) -> Result<u64, CtlError> {
    token
        .parse::<u64>()
        .map_err(|_| CtlError::parse(format!("invalid {} '{}': expected a non-negative integer", what, token)))
}
