// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canvas file format.
//!
//! A canvas file is the 4-byte magic `STND`, a version byte, and a zstd
//! compressed little-endian body:
//!
//! ```text
//! f32 offset x, f32 offset y, f32 scale
//! i32 node count, then per node: i32 blob length, blob
//! i32 connection count, then per connection: i64 (output index << 32) | input index
//! ```
//!
//! A node blob is a length-prefixed type id followed by key/value records
//! until the end of the blob. Port indices count non-empty ports in node
//! order, inputs before outputs.

use crate::editor::NodeEditor;
use crate::events::EditorEvent;
use crate::graph::Graph;
use crate::node::{Node, NodeFactory, NodeId, RegistryError};
use crate::port::PortId;
use crate::validation::{self, ConnectionStatus};
use crate::viewport::{PanAxes, Viewport};
use egui::Pos2;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use thiserror::Error;

/// File magic
pub const MAGIC: &[u8; 4] = b"STND";
/// Current format version
pub const VERSION: u8 = 1;
const COMPRESSION_LEVEL: i32 = 3;

const KEY_TITLE: &str = "Title";
const KEY_LEFT: &str = "Left";
const KEY_TOP: &str = "Top";
const KEY_WIDTH: &str = "Width";
const KEY_HEIGHT: &str = "Height";
const KEY_MARK: &str = "Mark";
const KEY_LOCK_OPTION: &str = "LockOption";
const KEY_LOCK_LOCATION: &str = "LockLocation";

/// Record keys written for every node; property bags may not use them
pub const STANDARD_KEYS: [&str; 8] = [
    KEY_TITLE,
    KEY_LEFT,
    KEY_TOP,
    KEY_WIDTH,
    KEY_HEIGHT,
    KEY_MARK,
    KEY_LOCK_OPTION,
    KEY_LOCK_LOCATION,
];

/// Errors reading a canvas
#[derive(Debug, Error)]
pub enum LoadError {
    /// The data does not start with the canvas magic
    #[error("Not a canvas file")]
    BadMagic,
    /// The version byte is not one this build reads
    #[error("Unsupported canvas version {0}")]
    UnsupportedVersion(u8),
    /// The data ended early
    #[error("Unexpected end of data while reading {context}")]
    Truncated {
        /// What was being read
        context: &'static str,
    },
    /// A length or count field is negative
    #[error("Invalid length for {context}")]
    InvalidLength {
        /// What was being read
        context: &'static str,
    },
    /// A text field is not UTF-8
    #[error("Invalid text in {context}")]
    InvalidText {
        /// What was being read
        context: &'static str,
    },
    /// A view field is NaN or infinite
    #[error("Non-finite value for {context}")]
    NonFinite {
        /// What was being read
        context: &'static str,
    },
    /// The body could not be decompressed
    #[error("Decompression failed: {0}")]
    Decompress(#[source] std::io::Error),
    /// A node's type id is not registered
    #[error("Node {index}: unknown type '{type_id}'")]
    UnknownType {
        /// Node position in the file
        index: usize,
        /// Unresolved type id
        type_id: String,
    },
    /// A node's factory rejected its data
    #[error("Node {index} ('{title}'): {source}")]
    NodeData {
        /// Node position in the file
        index: usize,
        /// Node title
        title: String,
        /// Factory error
        #[source]
        source: RegistryError,
    },
    /// A standard record could not be decoded
    #[error("Invalid property value: {0}")]
    Property(#[from] bincode::Error),
    /// Reading failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single node could not be encoded
#[derive(Debug, Error)]
pub enum NodeEncodeError {
    /// A property bag key collides with a standard record key
    #[error("Property key '{0}' is reserved")]
    ReservedKey(String),
    /// The type id does not fit its one-byte length prefix
    #[error("Type id is {0} bytes long, at most 255 are allowed")]
    TypeIdTooLong(usize),
    /// A record does not fit its length prefix
    #[error("Record '{0}' is too large")]
    TooLarge(String),
    /// A standard record could not be encoded
    #[error("Encoding failed: {0}")]
    Property(#[from] bincode::Error),
}

/// Errors writing a canvas
#[derive(Debug, Error)]
pub enum SaveError {
    /// One node could not be encoded; nothing was written
    #[error("Failed to save node '{title}': {source}")]
    Node {
        /// Node title
        title: String,
        /// Cause
        #[source]
        source: NodeEncodeError,
    },
    /// A section does not fit its length prefix
    #[error("Too many {0} to save")]
    TooLarge(&'static str),
    /// The body could not be compressed
    #[error("Compression failed: {0}")]
    Compress(#[source] std::io::Error),
    /// Writing failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a successful load
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadSummary {
    /// Loaded nodes in file order
    pub nodes: Vec<NodeId>,
    /// Connections restored
    pub connections: usize,
    /// Connections that were rejected or referenced unknown ports
    pub skipped_connections: usize,
}

fn push_record(blob: &mut Vec<u8>, key: &str, value: &[u8]) -> Result<(), NodeEncodeError> {
    let key_len = i32::try_from(key.len()).map_err(|_| NodeEncodeError::TooLarge(key.to_string()))?;
    let value_len = i32::try_from(value.len()).map_err(|_| NodeEncodeError::TooLarge(key.to_string()))?;
    blob.extend_from_slice(&key_len.to_le_bytes());
    blob.extend_from_slice(key.as_bytes());
    blob.extend_from_slice(&value_len.to_le_bytes());
    blob.extend_from_slice(value);
    Ok(())
}

fn push_value<T: Serialize>(blob: &mut Vec<u8>, key: &str, value: &T) -> Result<(), NodeEncodeError> {
    push_record(blob, key, &bincode::serialize(value)?)
}

/// Encode one node into its blob
pub fn encode_node(node: &Node) -> Result<Vec<u8>, NodeEncodeError> {
    let type_len = u8::try_from(node.type_id.len()).map_err(|_| NodeEncodeError::TypeIdTooLong(node.type_id.len()))?;
    let mut blob = vec![type_len];
    blob.extend_from_slice(node.type_id.as_bytes());

    push_value(&mut blob, KEY_TITLE, &node.title)?;
    push_value(&mut blob, KEY_LEFT, &node.position.x)?;
    push_value(&mut blob, KEY_TOP, &node.position.y)?;
    push_value(&mut blob, KEY_WIDTH, &node.size.x)?;
    push_value(&mut blob, KEY_HEIGHT, &node.size.y)?;
    push_value(&mut blob, KEY_MARK, &node.mark)?;
    push_value(&mut blob, KEY_LOCK_OPTION, &node.lock_option)?;
    push_value(&mut blob, KEY_LOCK_LOCATION, &node.lock_location)?;

    for (key, value) in node.properties.iter() {
        if STANDARD_KEYS.contains(&key) {
            return Err(NodeEncodeError::ReservedKey(key.to_string()));
        }
        push_record(&mut blob, key, value)?;
    }
    Ok(blob)
}

fn push_len(body: &mut Vec<u8>, len: usize, what: &'static str) -> Result<(), SaveError> {
    let len = i32::try_from(len).map_err(|_| SaveError::TooLarge(what))?;
    body.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

/// Write the graph and view state
pub fn save_canvas<W: Write>(mut writer: W, graph: &Graph, viewport: &Viewport) -> Result<(), SaveError> {
    let mut body = Vec::new();
    let offset = viewport.offset();
    body.extend_from_slice(&offset.x.to_le_bytes());
    body.extend_from_slice(&offset.y.to_le_bytes());
    body.extend_from_slice(&viewport.scale().to_le_bytes());

    push_len(&mut body, graph.node_count(), "nodes")?;
    for node in graph.nodes() {
        let blob = encode_node(node).map_err(|source| SaveError::Node {
            title: node.title.clone(),
            source,
        })?;
        push_len(&mut body, blob.len(), "node bytes")?;
        body.extend_from_slice(&blob);
    }

    let indices: HashMap<PortId, i64> = graph
        .ports_in_order()
        .enumerate()
        .map(|(index, port)| (port.id, index as i64))
        .collect();
    let links: Vec<i64> = graph
        .connections()
        .into_iter()
        .filter_map(|(output, input)| Some((*indices.get(&output)? << 32) | *indices.get(&input)?))
        .collect();
    push_len(&mut body, links.len(), "connections")?;
    for link in &links {
        body.extend_from_slice(&link.to_le_bytes());
    }

    let compressed = zstd::stream::encode_all(Cursor::new(body), COMPRESSION_LEVEL).map_err(SaveError::Compress)?;
    writer.write_all(MAGIC)?;
    writer.write_all(&[VERSION])?;
    writer.write_all(&compressed)?;
    writer.flush()?;

    tracing::info!(
        "Saved canvas: {} nodes, {} connections, {} bytes",
        graph.node_count(),
        links.len(),
        compressed.len() + MAGIC.len() + 1
    );
    Ok(())
}

/// Encode the graph and view state into a buffer
pub fn canvas_bytes(graph: &Graph, viewport: &Viewport) -> Result<Vec<u8>, SaveError> {
    let mut bytes = Vec::new();
    save_canvas(&mut bytes, graph, viewport)?;
    Ok(bytes)
}

/// Cursor over a decompressed body or a node blob
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, len: usize, context: &'static str) -> Result<&'a [u8], LoadError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(LoadError::Truncated { context })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N], LoadError> {
        self.take(N, context)?
            .try_into()
            .map_err(|_| LoadError::Truncated { context })
    }

    fn u8(&mut self, context: &'static str) -> Result<u8, LoadError> {
        Ok(self.array::<1>(context)?[0])
    }

    fn i32(&mut self, context: &'static str) -> Result<i32, LoadError> {
        Ok(i32::from_le_bytes(self.array(context)?))
    }

    fn i64(&mut self, context: &'static str) -> Result<i64, LoadError> {
        Ok(i64::from_le_bytes(self.array(context)?))
    }

    fn f32(&mut self, context: &'static str) -> Result<f32, LoadError> {
        Ok(f32::from_le_bytes(self.array(context)?))
    }

    fn finite_f32(&mut self, context: &'static str) -> Result<f32, LoadError> {
        let value = self.f32(context)?;
        if !value.is_finite() {
            return Err(LoadError::NonFinite { context });
        }
        Ok(value)
    }

    fn length(&mut self, context: &'static str) -> Result<usize, LoadError> {
        let value = self.i32(context)?;
        usize::try_from(value).map_err(|_| LoadError::InvalidLength { context })
    }

    fn str(&mut self, len: usize, context: &'static str) -> Result<&'a str, LoadError> {
        std::str::from_utf8(self.take(len, context)?).map_err(|_| LoadError::InvalidText { context })
    }
}

fn decode_value<T: DeserializeOwned>(value: &[u8]) -> Result<T, LoadError> {
    Ok(bincode::deserialize(value)?)
}

fn apply_record(node: &mut Node, key: &str, value: &[u8]) -> Result<(), LoadError> {
    match key {
        KEY_TITLE => node.title = decode_value(value)?,
        KEY_LEFT => node.position.x = decode_value(value)?,
        KEY_TOP => node.position.y = decode_value(value)?,
        KEY_WIDTH => node.size.x = decode_value(value)?,
        KEY_HEIGHT => node.size.y = decode_value(value)?,
        KEY_MARK => node.mark = decode_value(value)?,
        KEY_LOCK_OPTION => node.lock_option = decode_value(value)?,
        KEY_LOCK_LOCATION => node.lock_location = decode_value(value)?,
        _ => node.properties.set_raw(key, value.to_vec()),
    }
    Ok(())
}

struct DecodedNode {
    node: Node,
    factory: Arc<dyn NodeFactory>,
    lock_option: bool,
}

fn decode_node(index: usize, blob: &[u8], editor: &NodeEditor) -> Result<DecodedNode, LoadError> {
    let mut reader = ByteReader::new(blob);
    let type_len = usize::from(reader.u8("type id length")?);
    let type_id = reader.str(type_len, "type id")?;
    let factory = editor.registry.resolve(type_id).ok_or_else(|| LoadError::UnknownType {
        index,
        type_id: type_id.to_string(),
    })?;

    let mut node = factory.create();
    node.type_id = type_id.to_string();
    while !reader.is_empty() {
        let key_len = reader.length("property key length")?;
        let key = reader.str(key_len, "property key")?;
        let value_len = reader.length("property value length")?;
        let value = reader.take(value_len, "property value")?;
        apply_record(&mut node, key, value)?;
    }
    factory.load(&mut node).map_err(|source| LoadError::NodeData {
        index,
        title: node.title.clone(),
        source,
    })?;
    // locks are applied after the saved connections are restored
    let lock_option = std::mem::take(&mut node.lock_option);
    Ok(DecodedNode {
        node,
        factory,
        lock_option,
    })
}

/// Read a canvas and add its nodes and connections to the editor's graph.
///
/// The whole file is decoded before the graph is touched, so a failed load
/// leaves the editor unchanged. Connections go through the normal validation
/// path; rejected ones are skipped with a warning.
pub fn load_canvas<R: Read>(mut reader: R, editor: &mut NodeEditor) -> Result<LoadSummary, LoadError> {
    let mut header = [0u8; 5];
    reader.read_exact(&mut header).map_err(|err| match err.kind() {
        std::io::ErrorKind::UnexpectedEof => LoadError::Truncated { context: "header" },
        _ => LoadError::Io(err),
    })?;
    if &header[..4] != MAGIC {
        return Err(LoadError::BadMagic);
    }
    if header[4] != VERSION {
        return Err(LoadError::UnsupportedVersion(header[4]));
    }

    let body = zstd::stream::decode_all(reader).map_err(LoadError::Decompress)?;
    let mut body = ByteReader::new(&body);
    let offset_x = body.finite_f32("canvas offset")?;
    let offset_y = body.finite_f32("canvas offset")?;
    let scale = body.finite_f32("canvas scale")?;

    let node_count = body.length("node count")?;
    let mut decoded = Vec::new();
    for index in 0..node_count {
        let blob_len = body.length("node blob length")?;
        let blob = body.take(blob_len, "node blob")?;
        decoded.push(decode_node(index, blob, editor)?);
    }

    let link_count = body.length("connection count")?;
    let mut links = Vec::new();
    for _ in 0..link_count {
        links.push(body.i64("connection")?);
    }

    let ports: Vec<PortId> = decoded
        .iter()
        .flat_map(|d| d.node.inputs().iter().chain(d.node.outputs().iter()))
        .filter(|port| !port.is_empty())
        .map(|port| port.id)
        .collect();

    let mut summary = LoadSummary::default();
    let mut factories = Vec::with_capacity(decoded.len());
    for DecodedNode {
        node,
        factory,
        lock_option,
    } in decoded
    {
        let id = editor.graph.add_node(node);
        editor.notifier.emit(EditorEvent::NodeAdded(id));
        summary.nodes.push(id);
        factories.push((id, factory, lock_option));
    }

    for link in links {
        let output_index = usize::try_from(link >> 32).ok();
        let input_index = (link & 0xffff_ffff) as usize;
        let (Some(&output), Some(&input)) = (output_index.and_then(|i| ports.get(i)), ports.get(input_index)) else {
            tracing::warn!("Skipping connection {:#x}: port index out of range", link);
            summary.skipped_connections += 1;
            continue;
        };
        let status = validation::connect(&mut editor.graph, &mut editor.notifier, output, input);
        if status == ConnectionStatus::Connected {
            summary.connections += 1;
        } else {
            tracing::warn!("Skipping connection {:?} -> {:?}: {}", output, input, status);
            summary.skipped_connections += 1;
        }
    }

    editor.rebuild_bounds();
    editor.zoom(scale, Pos2::ZERO);
    editor.move_canvas(offset_x, offset_y, false, PanAxes::BOTH);

    for (id, factory, lock_option) in factories {
        if let Some(node) = editor.graph.node_mut(id) {
            node.lock_option = lock_option;
            factory.load_completed(node);
        }
        editor.notifier.emit(EditorEvent::LoadCompleted(id));
    }

    tracing::info!(
        "Loaded canvas: {} nodes, {} connections, {} skipped",
        summary.nodes.len(),
        summary.connections,
        summary.skipped_connections
    );
    Ok(summary)
}
