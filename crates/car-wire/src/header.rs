use std::fmt;

use ipld_core::cid::serde::CID_SERDE_PRIVATE_IDENTIFIER;
use ipld_core::ipld::Ipld;
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::cid::Cid;
use crate::error::WireError;
use crate::varint::{decode_varint, varint_len, write_varint};

/// The only archive format version this codec reads or writes.
pub const CAR_VERSION: u64 = 1;

const ROOTS_KEY: &str = "roots";
const VERSION_KEY: &str = "version";

/// CAR archive header — the first length-prefixed section of every archive.
///
/// ```text
/// ┌──────────────────────────────────────────────────────────┐
/// │ header_len  (varint)                                     │
/// │ header      [header_len bytes] DAG-CBOR map:             │
/// │               { "roots":   [CID, ...]  (tag 42 links)    │
/// │                 "version": 1 }                           │
/// └──────────────────────────────────────────────────────────┘
/// ```
///
/// Roots are kept in insertion order. They do not have to name blocks
/// that are present in the archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CarHeader {
    pub version: u64,
    pub roots: Vec<Cid>,
}

impl CarHeader {
    /// Create a version 1 header with the given roots.
    #[must_use]
    pub fn new(roots: Vec<Cid>) -> Self {
        Self {
            version: CAR_VERSION,
            roots,
        }
    }

    /// Encode the header map (without its length prefix).
    ///
    /// # Errors
    ///
    /// [`WireError::MalformedHeader`] if serialization fails.
    pub fn encode_body(&self) -> Result<Vec<u8>, WireError> {
        let body = HeaderMap {
            roots: &self.roots,
            version: self.version,
        };
        serde_ipld_dagcbor::to_vec(&body)
            .map_err(|e| WireError::malformed_header(format!("cannot encode header: {e}")))
    }

    /// Write the length-prefixed header to `w`.
    ///
    /// # Returns
    ///
    /// Total number of bytes written (prefix plus body).
    ///
    /// # Errors
    ///
    /// Anything [`encode_body`](Self::encode_body) returns, or
    /// [`WireError::Io`] if the writer fails.
    pub fn write_to(&self, w: &mut impl std::io::Write) -> Result<usize, WireError> {
        let body = self.encode_body()?;
        let n = write_varint(w, body.len() as u64)?;
        w.write_all(&body)?;
        Ok(n + body.len())
    }

    /// The length-prefixed header as a fresh buffer.
    ///
    /// # Errors
    ///
    /// Same as [`encode_body`](Self::encode_body).
    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Number of bytes [`write_to`](Self::write_to) produces.
    ///
    /// # Errors
    ///
    /// Same as [`encode_body`](Self::encode_body).
    pub fn encoded_len(&self) -> Result<usize, WireError> {
        let body_len = self.encode_body()?.len();
        Ok(varint_len(body_len as u64) + body_len)
    }

    /// Parse a length-prefixed header from the front of `buf`.
    ///
    /// # Returns
    ///
    /// `(header, bytes_consumed)`.
    ///
    /// # Errors
    ///
    /// - [`WireError::MalformedVarint`] if the length prefix is bad.
    /// - [`WireError::IncompleteFrame`] if `buf` is shorter than the prefix
    ///   declares.
    /// - Anything [`decode_body`](Self::decode_body) returns.
    pub fn read_from(buf: &[u8]) -> Result<(Self, usize), WireError> {
        let (declared, cursor) = decode_varint(buf)?;
        let available = buf.len() - cursor;
        let body_len = usize::try_from(declared)
            .ok()
            .filter(|&len| len <= available)
            .ok_or(WireError::IncompleteFrame {
                declared,
                available,
            })?;

        let header = Self::decode_body(&buf[cursor..cursor + body_len])?;
        Ok((header, cursor + body_len))
    }

    /// Parse the header map (without its length prefix).
    ///
    /// The version is checked before the roots, so a future-format header
    /// reports [`WireError::UnsupportedVersion`] even if its `roots` field
    /// is not a list or holds links that are not valid CIDs. A `roots` list
    /// holding something other than links cannot be parsed at all and is
    /// [`WireError::MalformedHeader`] whatever the version.
    ///
    /// # Errors
    ///
    /// - [`WireError::MalformedHeader`] if the body is not a DAG-CBOR map,
    ///   a field is missing or has the wrong type, or a root is not a
    ///   valid CID.
    /// - [`WireError::UnsupportedVersion`] if `version != 1`.
    pub fn decode_body(body: &[u8]) -> Result<Self, WireError> {
        let fields: HeaderFields = serde_ipld_dagcbor::from_slice(body)
            .map_err(|e| WireError::malformed_header(format!("invalid header: {e}")))?;

        let version = match fields.version {
            Some(Ipld::Integer(v)) => u64::try_from(v)
                .map_err(|_| WireError::malformed_header(format!("negative version {v}")))?,
            Some(_) => return Err(WireError::malformed_header("version is not an integer")),
            None => return Err(WireError::malformed_header("missing version")),
        };

        if version != CAR_VERSION {
            return Err(WireError::UnsupportedVersion { version });
        }

        let roots = match fields.roots {
            Some(RootsField::Links(links)) => links
                .into_iter()
                .map(|link| link.map_err(|e| WireError::malformed_header(format!("invalid root: {e}"))))
                .collect::<Result<Vec<_>, _>>()?,
            Some(RootsField::NotAList) => {
                return Err(WireError::malformed_header("roots is not a list"));
            }
            None => return Err(WireError::malformed_header("missing roots")),
        };

        Ok(Self { version, roots })
    }
}

// The header is the only DAG-CBOR in the format. Roots cross it as tag-42
// links whose bytes go straight through our own CID codec, so a root has
// the same validation and the same digest size range as a block CID.

struct HeaderMap<'a> {
    roots: &'a [Cid],
    version: u64,
}

impl Serialize for HeaderMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Canonical DAG-CBOR order: shorter keys first
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(ROOTS_KEY, &RootLinks(self.roots))?;
        map.serialize_entry(VERSION_KEY, &self.version)?;
        map.end()
    }
}

struct RootLinks<'a>(&'a [Cid]);

impl Serialize for RootLinks<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|cid| LinkBytes(cid.to_bytes())))
    }
}

/// Raw CID bytes, emitted as a tag-42 link.
struct LinkBytes(Vec<u8>);

impl Serialize for LinkBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(CID_SERDE_PRIVATE_IDENTIFIER, &RawBytes(&self.0))
    }
}

struct RawBytes<'a>(&'a [u8]);

impl Serialize for RawBytes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.0)
    }
}

/// Header fields as found, before any validation.
struct HeaderFields {
    version: Option<Ipld>,
    roots: Option<RootsField>,
}

impl<'de> Deserialize<'de> for HeaderFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = HeaderFields;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a CAR header map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut fields = HeaderFields {
                    version: None,
                    roots: None,
                };
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        VERSION_KEY => fields.version = Some(map.next_value()?),
                        ROOTS_KEY => fields.roots = Some(map.next_value()?),
                        _ => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_any(FieldsVisitor)
    }
}

/// The `roots` value. Anything that is not a list is kept as
/// [`RootsField::NotAList`] so the version can still be checked first.
enum RootsField {
    Links(Vec<Result<Cid, WireError>>),
    NotAList,
}

impl<'de> Deserialize<'de> for RootsField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RootsVisitor;

        impl<'de> Visitor<'de> for RootsVisitor {
            type Value = RootsField;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of CID links")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut links = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(64));
                while let Some(RootLink(link)) = seq.next_element()? {
                    links.push(link);
                }
                Ok(RootsField::Links(links))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
                Ok(RootsField::NotAList)
            }

            fn visit_newtype_struct<D: Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> Result<Self::Value, D::Error> {
                deserializer.deserialize_bytes(IgnoredAny)?;
                Ok(RootsField::NotAList)
            }

            fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
                Ok(RootsField::NotAList)
            }

            fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
                Ok(RootsField::NotAList)
            }

            fn visit_i128<E: de::Error>(self, _: i128) -> Result<Self::Value, E> {
                Ok(RootsField::NotAList)
            }

            fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
                Ok(RootsField::NotAList)
            }

            fn visit_u128<E: de::Error>(self, _: u128) -> Result<Self::Value, E> {
                Ok(RootsField::NotAList)
            }

            fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
                Ok(RootsField::NotAList)
            }

            fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
                Ok(RootsField::NotAList)
            }

            fn visit_bytes<E: de::Error>(self, _: &[u8]) -> Result<Self::Value, E> {
                Ok(RootsField::NotAList)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(RootsField::NotAList)
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(RootsField::NotAList)
            }
        }

        deserializer.deserialize_any(RootsVisitor)
    }
}

/// One entry of the `roots` list. A tag-42 link whose bytes are not a
/// valid CID is kept as an error value; anything else fails the parse.
struct RootLink(Result<Cid, WireError>);

impl<'de> Deserialize<'de> for RootLink {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LinkVisitor;

        impl<'de> Visitor<'de> for LinkVisitor {
            type Value = RootLink;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a CID link")
            }

            // Tag 42 arrives as a newtype struct wrapping the CID bytes,
            // multibase prefix already stripped
            fn visit_newtype_struct<D: Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> Result<Self::Value, D::Error> {
                deserializer.deserialize_bytes(CidBytesVisitor)
            }
        }

        deserializer.deserialize_any(LinkVisitor)
    }
}

struct CidBytesVisitor;

impl<'de> Visitor<'de> for CidBytesVisitor {
    type Value = RootLink;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CID bytes")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        Ok(RootLink(Cid::try_from(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multihash::Multihash;

    fn raw_cid(fill: u8) -> Cid {
        Cid::new_v1(0x55, Multihash::wrap(0x12, &[fill; 32]))
    }

    fn encode_map(entries: Vec<(&str, Ipld)>) -> Vec<u8> {
        use std::collections::BTreeMap;

        let map: BTreeMap<String, Ipld> = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        serde_ipld_dagcbor::to_vec(&Ipld::Map(map)).unwrap()
    }

    #[test]
    fn roundtrip_single_root() {
        let header = CarHeader::new(vec![raw_cid(1)]);
        let bytes = header.to_bytes().unwrap();
        let (parsed, consumed) = CarHeader::read_from(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(consumed, bytes.len());
        assert_eq!(header.encoded_len().unwrap(), bytes.len());
    }

    #[test]
    fn root_order_preserved() {
        let roots = vec![raw_cid(9), raw_cid(1), raw_cid(5)];
        let bytes = CarHeader::new(roots.clone()).to_bytes().unwrap();
        let (parsed, _) = CarHeader::read_from(&bytes).unwrap();
        assert_eq!(parsed.roots, roots);
    }

    #[test]
    fn empty_roots_allowed() {
        let bytes = CarHeader::new(Vec::new()).to_bytes().unwrap();
        let (parsed, _) = CarHeader::read_from(&bytes).unwrap();
        assert!(parsed.roots.is_empty());
    }

    #[test]
    fn v0_root_survives() {
        let v0 = Cid::new_v0(Multihash::wrap(0x12, &[7; 32])).unwrap();
        let bytes = CarHeader::new(vec![v0.clone()]).to_bytes().unwrap();
        let (parsed, _) = CarHeader::read_from(&bytes).unwrap();
        assert_eq!(parsed.roots, vec![v0]);
    }

    #[test]
    fn oversized_digest_root_survives() {
        // Unregistered code, digest far longer than any IPLD link type holds
        let big = Cid::new_v1(0x55, Multihash::wrap(0x9999, &[7; 100]));
        let header = CarHeader::new(vec![big.clone(), raw_cid(2)]);
        let bytes = header.to_bytes().unwrap();

        let (parsed, consumed) = CarHeader::read_from(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.roots[0], big);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn future_version_wins_over_bad_roots() {
        let body = encode_map(vec![
            ("roots", Ipld::String("somewhere else".into())),
            ("version", Ipld::Integer(2)),
        ]);
        assert!(matches!(
            CarHeader::decode_body(&body),
            Err(WireError::UnsupportedVersion { version: 2 })
        ));
    }

    #[test]
    fn reject_roots_not_a_list() {
        let body = encode_map(vec![
            ("roots", Ipld::Integer(5)),
            ("version", Ipld::Integer(1)),
        ]);
        assert!(matches!(
            CarHeader::decode_body(&body),
            Err(WireError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn reject_link_that_is_not_a_cid() {
        let bogus = ipld_core::cid::Cid::try_from(raw_cid(4).to_bytes().as_slice()).unwrap();
        let mut body = encode_map(vec![
            ("roots", Ipld::List(vec![Ipld::Link(bogus)])),
            ("version", Ipld::Integer(1)),
        ]);
        // Swap the CID version byte (first byte after the 0x00 prefix) for 3
        let at = body.iter().position(|&b| b == 0x00).unwrap();
        body[at + 1] = 0x03;
        assert!(matches!(
            CarHeader::decode_body(&body),
            Err(WireError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn canonical_layout() {
        let bytes = CarHeader::new(vec![raw_cid(0)]).to_bytes().unwrap();
        // 58-byte body: map(2), "roots", array(1), tag 42, bytes(37),
        // 0x00 multibase prefix, 36-byte CID, "version", 1
        assert_eq!(bytes[0], 0x3a);
        assert_eq!(&bytes[1..8], &[0xa2, 0x65, b'r', b'o', b'o', b't', b's']);
        assert_eq!(&bytes[8..13], &[0x81, 0xd8, 0x2a, 0x58, 0x25]);
        assert_eq!(bytes[13], 0x00);
        assert_eq!(&bytes[50..], &[0x67, b'v', b'e', b'r', b's', b'i', b'o', b'n', 0x01]);
    }

    #[test]
    fn reject_unsupported_version() {
        let body = encode_map(vec![
            ("roots", Ipld::List(vec![])),
            ("version", Ipld::Integer(2)),
        ]);
        assert!(matches!(
            CarHeader::decode_body(&body),
            Err(WireError::UnsupportedVersion { version: 2 })
        ));
    }

    #[test]
    fn reject_missing_roots() {
        let body = encode_map(vec![("version", Ipld::Integer(1))]);
        assert!(matches!(
            CarHeader::decode_body(&body),
            Err(WireError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn reject_missing_version() {
        let body = encode_map(vec![("roots", Ipld::List(vec![]))]);
        assert!(matches!(
            CarHeader::decode_body(&body),
            Err(WireError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn reject_non_link_root() {
        let body = encode_map(vec![
            ("roots", Ipld::List(vec![Ipld::Bytes(vec![1, 2, 3])])),
            ("version", Ipld::Integer(1)),
        ]);
        assert!(matches!(
            CarHeader::decode_body(&body),
            Err(WireError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn reject_non_map_body() {
        let body = serde_ipld_dagcbor::to_vec(&Ipld::List(vec![])).unwrap();
        assert!(matches!(
            CarHeader::decode_body(&body),
            Err(WireError::MalformedHeader { .. })
        ));
        assert!(matches!(
            CarHeader::decode_body(&[0xff, 0x00]),
            Err(WireError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn reject_truncated_body() {
        let bytes = CarHeader::new(vec![raw_cid(3)]).to_bytes().unwrap();
        let result = CarHeader::read_from(&bytes[..bytes.len() - 1]);
        assert!(matches!(
            result,
            Err(WireError::IncompleteFrame {
                declared: 58,
                available: 57
            })
        ));
    }
}
