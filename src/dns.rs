//! DNS wire-format handling.
//!
//! The resolver never decodes whole messages. It reads the header, walks
//! names with compression, finds the first NS target in the authority
//! section and flips a handful of header bits before replying.

use thiserror::Error;

pub const HEADER_LEN: usize = 12;

/// Largest message accepted or forwarded over UDP.
pub const MAX_UDP_MESSAGE: usize = 512;

const MAX_NAME_LEN: usize = 255;
const MAX_LABEL_LEN: usize = 63;
const MAX_POINTER_JUMPS: usize = 128;

/// Fixed part of a resource record after its owner name:
/// TYPE (2) + CLASS (2) + TTL (4) + RDLENGTH (2).
const RR_FIXED_LEN: usize = 10;

pub const TYPE_NS: u16 = 2;

pub const RCODE_NOERROR: u8 = 0;
pub const RCODE_SERVFAIL: u8 = 2;
pub const RCODE_NXDOMAIN: u8 = 3;

// Byte 2 of the header.
const FLAG_QR: u8 = 0x80;
const FLAG_AA: u8 = 0x04;
// Byte 3 of the header.
const FLAG_RA: u8 = 0x80;
const RCODE_MASK: u8 = 0x0F;

/// Ways a message can fail to parse.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    #[error("message truncated")]
    Truncated,
    #[error("label longer than 63 octets")]
    LabelTooLong,
    #[error("name longer than 255 octets")]
    NameTooLong,
    #[error("too many compression pointers")]
    PointerLoop,
    #[error("reserved label type {0:#04x}")]
    BadLabelType(u8),
}

/// The fixed 12-byte DNS header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub flags: u16,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl Header {
    pub fn parse(msg: &[u8]) -> Result<Self, WireError> {
        if msg.len() < HEADER_LEN {
            return Err(WireError::Truncated);
        }

        Ok(Self {
            id: read_u16(msg, 0)?,
            flags: read_u16(msg, 2)?,
            qdcount: read_u16(msg, 4)?,
            ancount: read_u16(msg, 6)?,
            nscount: read_u16(msg, 8)?,
            arcount: read_u16(msg, 10)?,
        })
    }

    pub fn is_response(&self) -> bool {
        self.flags & 0x8000 != 0
    }

    pub fn is_authoritative(&self) -> bool {
        self.flags & 0x0400 != 0
    }

    pub fn recursion_available(&self) -> bool {
        self.flags & 0x0080 != 0
    }

    pub fn rcode(&self) -> u8 {
        (self.flags & 0x000F) as u8
    }

    /// True for a referral: NOERROR, no answers and at least one authority
    /// record. Iteration continues only while this holds.
    pub fn is_referral(&self) -> bool {
        self.rcode() == RCODE_NOERROR && self.ancount == 0 && self.nscount >= 1
    }
}

/// A question section entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
}

impl Question {
    /// Parse the first question of a message.
    pub fn parse(msg: &[u8]) -> Result<Self, WireError> {
        let (question, _) = Self::parse_at(msg, HEADER_LEN)?;

        Ok(question)
    }

    fn parse_at(msg: &[u8], offset: usize) -> Result<(Self, usize), WireError> {
        let (name, pos) = parse_name(msg, offset)?;
        let qtype = read_u16(msg, pos)?;
        let qclass = read_u16(msg, pos + 2)?;

        Ok((Self { name, qtype, qclass }, pos + 4))
    }

    /// Names compare case-insensitively, types and classes exactly.
    pub fn matches(&self, other: &Question) -> bool {
        self.qtype == other.qtype
            && self.qclass == other.qclass
            && self.name.eq_ignore_ascii_case(&other.name)
    }
}

/// Parse the name starting at `offset`, following compression pointers.
///
/// Returns the dot-joined name without a trailing dot (the root name is the
/// empty string) and the offset just past the name as it appears at
/// `offset`, which is the position of the following field.
pub fn parse_name(msg: &[u8], offset: usize) -> Result<(String, usize), WireError> {
    let mut name = String::new();
    let mut pos = offset;
    let mut end = None;
    let mut jumps = 0;
    // Wire length including the terminating zero octet.
    let mut wire_len = 1;

    loop {
        let len = *msg.get(pos).ok_or(WireError::Truncated)?;

        match len & 0xC0 {
            0x00 => {}
            0xC0 => {
                let low = *msg.get(pos + 1).ok_or(WireError::Truncated)?;
                if end.is_none() {
                    end = Some(pos + 2);
                }
                jumps += 1;
                if jumps > MAX_POINTER_JUMPS {
                    return Err(WireError::PointerLoop);
                }
                pos = (usize::from(len & 0x3F) << 8) | usize::from(low);
                continue;
            }
            other => return Err(WireError::BadLabelType(other)),
        }

        if len == 0 {
            break;
        }

        let len = usize::from(len);
        if len > MAX_LABEL_LEN {
            return Err(WireError::LabelTooLong);
        }
        wire_len += len + 1;
        if wire_len > MAX_NAME_LEN {
            return Err(WireError::NameTooLong);
        }

        let label = msg.get(pos + 1..pos + 1 + len).ok_or(WireError::Truncated)?;
        if !name.is_empty() {
            name.push('.');
        }
        name.extend(label.iter().map(|&b| b as char));
        pos += 1 + len;
    }

    Ok((name, end.unwrap_or(pos + 1)))
}

/// Find the name server named by the first NS record of the authority
/// section.
///
/// Questions and answers are walked record by record rather than assuming
/// a fixed layout, so OPT records or compressed question names do not
/// shift the result. Returns `None` when the authority section holds no NS
/// record, as in a NODATA response carrying only an SOA.
pub fn first_authority_ns(msg: &[u8]) -> Result<Option<String>, WireError> {
    let header = Header::parse(msg)?;
    let mut pos = HEADER_LEN;

    for _ in 0..header.qdcount {
        let (_, next) = Question::parse_at(msg, pos)?;
        pos = next;
    }

    for _ in 0..header.ancount {
        pos = skip_record(msg, pos)?;
    }

    for _ in 0..header.nscount {
        let (_, fixed) = parse_name(msg, pos)?;
        let rtype = read_u16(msg, fixed)?;
        if rtype == TYPE_NS {
            let (target, _) = parse_name(msg, fixed + RR_FIXED_LEN)?;
            return Ok(Some(target));
        }
        pos = skip_record(msg, pos)?;
    }

    Ok(None)
}

fn skip_record(msg: &[u8], offset: usize) -> Result<usize, WireError> {
    let (_, fixed) = parse_name(msg, offset)?;
    let rdlength = usize::from(read_u16(msg, fixed + 8)?);
    let end = fixed + RR_FIXED_LEN + rdlength;
    if end > msg.len() {
        return Err(WireError::Truncated);
    }

    Ok(end)
}

fn read_u16(msg: &[u8], offset: usize) -> Result<u16, WireError> {
    match msg.get(offset..offset + 2) {
        Some(bytes) => Ok(u16::from_be_bytes([bytes[0], bytes[1]])),
        None => Err(WireError::Truncated),
    }
}

/// Header fixups for an upstream answer relayed to the client: AA is
/// cleared and RA set. RCODE and everything else stays as received.
pub fn mark_relayed(reply: &mut [u8]) {
    if reply.len() < HEADER_LEN {
        return;
    }
    reply[2] &= !FLAG_AA;
    reply[3] |= FLAG_RA;
}

/// Turn a client query into its NXDOMAIN sinkhole reply.
///
/// The query bytes are reused as-is, keeping the transaction ID and the
/// question. QR, RA and RCODE=3 are set; AA is set only when
/// `authoritative` is true.
pub fn blocked_reply(query: &[u8], authoritative: bool) -> Vec<u8> {
    let mut reply = query.to_vec();
    if reply.len() < HEADER_LEN {
        return reply;
    }

    reply[2] |= FLAG_QR;
    if authoritative {
        reply[2] |= FLAG_AA;
    }
    reply[3] = (reply[3] & !RCODE_MASK) | FLAG_RA | RCODE_NXDOMAIN;

    reply
}

/// Encode a dot-joined name as uncompressed labels.
#[cfg(test)]
pub(crate) fn encode_name(buf: &mut Vec<u8>, name: &str) {
    if !name.is_empty() {
        for label in name.split('.') {
            buf.push(label.len() as u8);
            buf.extend_from_slice(label.as_bytes());
        }
    }
    buf.push(0);
}

/// Message construction for tests and mock upstream servers.
#[cfg(test)]
pub(crate) mod builder {
    use super::*;

    const TYPE_A: u16 = 1;
    const TYPE_SOA: u16 = 6;
    const CLASS_IN: u16 = 1;

    struct Record {
        name: String,
        rtype: u16,
        rdata: Vec<u8>,
    }

    pub(crate) struct MessageBuilder {
        id: u16,
        flags: u16,
        question: Question,
        answers: Vec<Record>,
        authority: Vec<Record>,
        additional: Vec<Record>,
    }

    impl MessageBuilder {
        /// A recursive A query for `name`.
        pub(crate) fn query(id: u16, name: &str) -> Self {
            Self {
                id,
                flags: 0x0100,
                question: Question {
                    name: name.to_string(),
                    qtype: TYPE_A,
                    qclass: CLASS_IN,
                },
                answers: Vec::new(),
                authority: Vec::new(),
                additional: Vec::new(),
            }
        }

        /// A response echoing the ID and question of `query`, AA set.
        pub(crate) fn response_to(query: &[u8]) -> Self {
            let header = Header::parse(query).expect("query header");
            let question = Question::parse(query).expect("query question");

            Self {
                id: header.id,
                flags: 0x8400 | (header.flags & 0x0100),
                question,
                answers: Vec::new(),
                authority: Vec::new(),
                additional: Vec::new(),
            }
        }

        pub(crate) fn id(mut self, id: u16) -> Self {
            self.id = id;
            self
        }

        pub(crate) fn qname(mut self, name: &str) -> Self {
            self.question.name = name.to_string();
            self
        }

        pub(crate) fn rcode(mut self, rcode: u8) -> Self {
            self.flags = (self.flags & 0xFFF0) | u16::from(rcode);
            self
        }

        pub(crate) fn answer_a(mut self, name: &str, addr: [u8; 4]) -> Self {
            self.answers.push(Record {
                name: name.to_string(),
                rtype: TYPE_A,
                rdata: addr.to_vec(),
            });
            self
        }

        pub(crate) fn authority_ns(mut self, zone: &str, target: &str) -> Self {
            let mut rdata = Vec::new();
            encode_name(&mut rdata, target);
            self.authority.push(Record {
                name: zone.to_string(),
                rtype: TYPE_NS,
                rdata,
            });
            self
        }

        pub(crate) fn authority_soa(mut self, zone: &str) -> Self {
            let mut rdata = Vec::new();
            encode_name(&mut rdata, &format!("ns.{zone}"));
            encode_name(&mut rdata, &format!("hostmaster.{zone}"));
            for value in [1u32, 7200, 900, 1_209_600, 300] {
                rdata.extend_from_slice(&value.to_be_bytes());
            }
            self.authority.push(Record {
                name: zone.to_string(),
                rtype: TYPE_SOA,
                rdata,
            });
            self
        }

        pub(crate) fn additional_a(mut self, name: &str, addr: [u8; 4]) -> Self {
            self.additional.push(Record {
                name: name.to_string(),
                rtype: TYPE_A,
                rdata: addr.to_vec(),
            });
            self
        }

        pub(crate) fn build(self) -> Vec<u8> {
            let mut data = Vec::with_capacity(MAX_UDP_MESSAGE);

            data.extend_from_slice(&self.id.to_be_bytes());
            data.extend_from_slice(&self.flags.to_be_bytes());
            data.extend_from_slice(&1u16.to_be_bytes());
            data.extend_from_slice(&(self.answers.len() as u16).to_be_bytes());
            data.extend_from_slice(&(self.authority.len() as u16).to_be_bytes());
            data.extend_from_slice(&(self.additional.len() as u16).to_be_bytes());

            encode_name(&mut data, &self.question.name);
            data.extend_from_slice(&self.question.qtype.to_be_bytes());
            data.extend_from_slice(&self.question.qclass.to_be_bytes());

            for record in self
                .answers
                .iter()
                .chain(&self.authority)
                .chain(&self.additional)
            {
                encode_name(&mut data, &record.name);
                data.extend_from_slice(&record.rtype.to_be_bytes());
                data.extend_from_slice(&CLASS_IN.to_be_bytes());
                data.extend_from_slice(&172_800u32.to_be_bytes());
                data.extend_from_slice(&(record.rdata.len() as u16).to_be_bytes());
                data.extend_from_slice(&record.rdata);
            }

            data
        }
    }
}
