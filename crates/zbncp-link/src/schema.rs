//! Command body layouts.
//!
//! The bytes after the envelope header are command specific. A
//! [`CommandSchema`] maps `(call_id, packet_kind)` to a flat list of fields
//! and renders a body against it. [`SchemaRegistry`] is the table-driven
//! implementation; [`SchemaRegistry::builtin`] knows a handful of common
//! calls and anything else renders as opaque trailing bytes.

use std::collections::BTreeMap;
use std::fmt;

use bytes::{Buf, Bytes};

use crate::PacketKind;

/// Wire type of one field. Integers are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U16,
    U32,
    U64,
    /// Fixed-size byte string.
    Bytes(usize),
    /// Every remaining byte.
    Rest,
}

impl FieldKind {
    /// Bytes consumed, or `None` for [`FieldKind::Rest`].
    pub const fn size(&self) -> Option<usize> {
        match self {
            FieldKind::U8 => Some(1),
            FieldKind::U16 => Some(2),
            FieldKind::U32 => Some(4),
            FieldKind::U64 => Some(8),
            FieldKind::Bytes(n) => Some(*n),
            FieldKind::Rest => None,
        }
    }
}

/// One named field of a command body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldLayout {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        FieldLayout { name, kind }
    }
}

/// Layouts of one command, per packet kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLayout {
    /// Command name.
    pub name: &'static str,
    pub request: &'static [FieldLayout],
    pub response: &'static [FieldLayout],
    pub indication: &'static [FieldLayout],
}

impl CommandLayout {
    /// Fields for `kind`.
    pub fn fields(&self, kind: PacketKind) -> &'static [FieldLayout] {
        match kind {
            PacketKind::Request => self.request,
            PacketKind::Response => self.response,
            PacketKind::Indication => self.indication,
        }
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Bytes(Bytes),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::U8(v) => write!(f, "{}", v),
            FieldValue::U16(v) => write!(f, "0x{:04X}", v),
            FieldValue::U32(v) => write!(f, "0x{:08X}", v),
            FieldValue::U64(v) => write!(f, "0x{:016X}", v),
            FieldValue::Bytes(b) => write!(f, "{}", hex::encode(b)),
        }
    }
}

/// A field with its decoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedField {
    pub name: &'static str,
    pub value: FieldValue,
}

/// Best-effort rendering of a command body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedBody {
    /// Command name, if known.
    pub command: Option<&'static str>,
    /// Fields decoded in layout order.
    pub fields: Vec<RenderedField>,
    /// Bytes left after the last field (the whole body for unknown commands).
    pub trailing: Bytes,
    /// The body ended inside a field.
    pub truncated: bool,
}

/// Maps a call to its body layout.
pub trait CommandSchema {
    /// Name of the command identified by `call_id`.
    fn command_name(&self, call_id: u16) -> Option<&'static str>;

    /// Field layout for `call_id` in a packet of `kind`.
    fn layout(&self, call_id: u16, kind: PacketKind) -> Option<&'static [FieldLayout]>;

    /// Render `body` against the layout. Never fails: short bodies are
    /// flagged as truncated and extra bytes are kept as trailing data.
    fn render(&self, call_id: u16, kind: PacketKind, body: &[u8]) -> RenderedBody {
        let mut rendered = RenderedBody {
            command: self.command_name(call_id),
            ..Default::default()
        };
        let Some(layout) = self.layout(call_id, kind) else {
            rendered.trailing = Bytes::copy_from_slice(body);
            return rendered;
        };

        let mut buf = body;
        for field in layout {
            if let Some(size) = field.kind.size() {
                if buf.remaining() < size {
                    rendered.truncated = true;
                    break;
                }
            }
            let value = match field.kind {
                FieldKind::U8 => FieldValue::U8(buf.get_u8()),
                FieldKind::U16 => FieldValue::U16(buf.get_u16_le()),
                FieldKind::U32 => FieldValue::U32(buf.get_u32_le()),
                FieldKind::U64 => FieldValue::U64(buf.get_u64_le()),
                FieldKind::Bytes(n) => FieldValue::Bytes(buf.copy_to_bytes(n)),
                FieldKind::Rest => {
                    let rest = buf.remaining();
                    FieldValue::Bytes(buf.copy_to_bytes(rest))
                }
            };
            rendered.fields.push(RenderedField {
                name: field.name,
                value,
            });
        }
        rendered.trailing = Bytes::copy_from_slice(buf);
        rendered
    }
}

/// Table of command layouts keyed by call id.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    commands: BTreeMap<u16, CommandLayout>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the common calls.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (call_id, layout) in builtin::BUILTIN {
            registry.register(*call_id, *layout);
        }
        registry
    }

    /// Add or replace the layout of `call_id`.
    pub fn register(&mut self, call_id: u16, layout: CommandLayout) -> &mut Self {
        self.commands.insert(call_id, layout);
        self
    }

    /// Get the layout of `call_id`.
    pub fn get(&self, call_id: u16) -> Option<&CommandLayout> {
        self.commands.get(&call_id)
    }

    /// Number of known commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is known.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl CommandSchema for SchemaRegistry {
    fn command_name(&self, call_id: u16) -> Option<&'static str> {
        self.get(call_id).map(|layout| layout.name)
    }

    fn layout(&self, call_id: u16, kind: PacketKind) -> Option<&'static [FieldLayout]> {
        self.get(call_id).map(|layout| layout.fields(kind))
    }
}

mod builtin {
    use super::CommandLayout;
    use super::FieldKind::{self, *};
    use super::FieldLayout;

    const fn field(name: &'static str, kind: FieldKind) -> FieldLayout {
        FieldLayout::new(name, kind)
    }

    pub(super) const NONE: &[FieldLayout] = &[];

    pub(super) const BUILTIN: &[(u16, CommandLayout)] = &[
        (
            0x0001,
            CommandLayout {
                name: "GET_MODULE_VERSION",
                request: NONE,
                response: &[
                    field("fw_version", U32),
                    field("stack_version", U32),
                    field("protocol_version", U32),
                ],
                indication: NONE,
            },
        ),
        (
            0x0002,
            CommandLayout {
                name: "NCP_RESET",
                request: &[field("option", U8)],
                response: NONE,
                indication: NONE,
            },
        ),
        (
            0x0004,
            CommandLayout {
                name: "GET_ZIGBEE_ROLE",
                request: NONE,
                response: &[field("role", U8)],
                indication: NONE,
            },
        ),
        (
            0x0005,
            CommandLayout {
                name: "SET_ZIGBEE_ROLE",
                request: &[field("role", U8)],
                response: NONE,
                indication: NONE,
            },
        ),
        (
            0x0006,
            CommandLayout {
                name: "GET_ZIGBEE_CHANNEL_MASK",
                request: NONE,
                response: &[field("entries", U8), field("channel_list", Rest)],
                indication: NONE,
            },
        ),
        (
            0x0007,
            CommandLayout {
                name: "SET_ZIGBEE_CHANNEL_MASK",
                request: &[field("page", U8), field("mask", U32)],
                response: NONE,
                indication: NONE,
            },
        ),
        (
            0x0008,
            CommandLayout {
                name: "GET_ZIGBEE_CHANNEL",
                request: NONE,
                response: &[field("page", U8), field("channel", U8)],
                indication: NONE,
            },
        ),
        (
            0x0009,
            CommandLayout {
                name: "GET_PAN_ID",
                request: NONE,
                response: &[field("pan_id", U16)],
                indication: NONE,
            },
        ),
        (
            0x000A,
            CommandLayout {
                name: "SET_PAN_ID",
                request: &[field("pan_id", U16)],
                response: NONE,
                indication: NONE,
            },
        ),
        (
            0x000B,
            CommandLayout {
                name: "GET_LOCAL_IEEE_ADDR",
                request: &[field("interface", U8)],
                response: &[field("interface", U8), field("ieee_addr", U64)],
                indication: NONE,
            },
        ),
        (
            0x000C,
            CommandLayout {
                name: "SET_LOCAL_IEEE_ADDR",
                request: &[field("interface", U8), field("ieee_addr", U64)],
                response: NONE,
                indication: NONE,
            },
        ),
        (
            0x0201,
            CommandLayout {
                name: "ZDO_NWK_ADDR_REQ",
                request: &[
                    field("dst_nwk_addr", U16),
                    field("ieee_addr", U64),
                    field("request_type", U8),
                    field("start_index", U8),
                ],
                response: &[
                    field("ieee_addr", U64),
                    field("nwk_addr", U16),
                    field("associated", Rest),
                ],
                indication: NONE,
            },
        ),
        (
            0x0202,
            CommandLayout {
                name: "ZDO_IEEE_ADDR_REQ",
                request: &[
                    field("dst_nwk_addr", U16),
                    field("nwk_addr", U16),
                    field("request_type", U8),
                    field("start_index", U8),
                ],
                response: &[
                    field("ieee_addr", U64),
                    field("nwk_addr", U16),
                    field("associated", Rest),
                ],
                indication: NONE,
            },
        ),
        (
            0x0223,
            CommandLayout {
                name: "ZDO_DEV_ANNCE_IND",
                request: NONE,
                response: NONE,
                indication: &[
                    field("nwk_addr", U16),
                    field("ieee_addr", U64),
                    field("capability", U8),
                ],
            },
        ),
        (
            0x0301,
            CommandLayout {
                name: "APSDE_DATA_REQ",
                request: &[
                    field("params_len", U8),
                    field("data_len", U16),
                    field("dst_addr", Bytes(8)),
                    field("profile_id", U16),
                    field("cluster_id", U16),
                    field("dst_endpoint", U8),
                    field("src_endpoint", U8),
                    field("payload", Rest),
                ],
                response: &[
                    field("dst_addr", Bytes(8)),
                    field("dst_endpoint", U8),
                    field("src_endpoint", U8),
                    field("tx_time", U32),
                    field("dst_addr_mode", U8),
                ],
                indication: NONE,
            },
        ),
        (
            0x0401,
            CommandLayout {
                name: "NWK_FORMATION",
                request: &[field("channel_list_len", U8), field("channel_list", Rest)],
                response: &[field("nwk_addr", U16)],
                indication: NONE,
            },
        ),
        (
            0x0403,
            CommandLayout {
                name: "NWK_PERMIT_JOINING",
                request: &[field("duration", U8)],
                response: NONE,
                indication: NONE,
            },
        ),
    ];
}

#[cfg(test)]
mod tests {
    use super::builtin::{BUILTIN, NONE};
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let registry = SchemaRegistry::builtin();
        assert_eq!(registry.len(), BUILTIN.len());
        assert_eq!(registry.command_name(0x0009), Some("GET_PAN_ID"));
        assert_eq!(registry.layout(0x0009, PacketKind::Request), Some(NONE));
        assert!(registry.layout(0x7777, PacketKind::Request).is_none());
    }

    #[test]
    fn test_call_ids_unique() {
        let mut ids: Vec<u16> = BUILTIN.iter().map(|(id, _)| *id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), BUILTIN.len());
    }

    #[test]
    fn test_render_response() {
        let registry = SchemaRegistry::builtin();
        let body = [0x01, 0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11];
        let rendered = registry.render(0x000B, PacketKind::Response, &body);

        assert_eq!(rendered.command, Some("GET_LOCAL_IEEE_ADDR"));
        assert!(!rendered.truncated);
        assert!(rendered.trailing.is_empty());
        assert_eq!(rendered.fields[0].value, FieldValue::U8(1));
        assert_eq!(
            rendered.fields[1].value,
            FieldValue::U64(0x1122_3344_5566_7788)
        );
        assert_eq!(rendered.fields[1].value.to_string(), "0x1122334455667788");
    }

    #[test]
    fn test_render_truncated_and_trailing() {
        let registry = SchemaRegistry::builtin();

        let short = registry.render(0x0009, PacketKind::Response, &[0x34]);
        assert!(short.truncated);
        assert!(short.fields.is_empty());
        assert_eq!(&short.trailing[..], &[0x34]);

        let long = registry.render(0x0009, PacketKind::Response, &[0x34, 0x12, 0xFF]);
        assert!(!long.truncated);
        assert_eq!(long.fields[0].value, FieldValue::U16(0x1234));
        assert_eq!(&long.trailing[..], &[0xFF]);
    }

    #[test]
    fn test_render_rest_field() {
        let registry = SchemaRegistry::builtin();
        let rendered = registry.render(0x0401, PacketKind::Request, &[2, 0xAA, 0xBB]);
        assert_eq!(
            rendered.fields[1].value,
            FieldValue::Bytes(Bytes::from_static(&[0xAA, 0xBB]))
        );
        assert_eq!(rendered.fields[1].value.to_string(), "aabb");
        assert!(rendered.trailing.is_empty());
    }

    #[test]
    fn test_render_unknown_command() {
        let registry = SchemaRegistry::new();
        let rendered = registry.render(0x0001, PacketKind::Response, &[1, 2, 3]);
        assert_eq!(rendered.command, None);
        assert!(rendered.fields.is_empty());
        assert_eq!(&rendered.trailing[..], &[1, 2, 3]);
    }

    #[test]
    fn test_register_overrides() {
        const CUSTOM: CommandLayout = CommandLayout {
            name: "VENDOR_PING",
            request: &[FieldLayout::new("token", FieldKind::U32)],
            response: NONE,
            indication: NONE,
        };
        let mut registry = SchemaRegistry::builtin();
        registry.register(0x0001, CUSTOM);
        assert_eq!(registry.command_name(0x0001), Some("VENDOR_PING"));
        assert_eq!(
            registry.render(0x0001, PacketKind::Request, &[1, 0, 0, 0]).fields[0].value,
            FieldValue::U32(1)
        );
    }
}
