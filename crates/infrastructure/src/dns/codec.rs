//! Wire codec: hickory messages in and out of the routing engine's record
//! model. Only A/AAAA/CNAME rdata is interpreted; everything else crosses the
//! boundary as uncompressed bytes.

use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA, CNAME, NULL};
use hickory_proto::rr::{DNSClass, Name, RData, Record};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use janus_dns_domain::{
    normalize_name, DnsError, DnsReply, EcsAddress, Question, Rcode, RecordData, RecordType,
    ResourceRecord,
};
use std::str::FromStr;
use tracing::debug;

const EDNS_MAX_PAYLOAD: u16 = 4096;
/// CLIENT-SUBNET option code (RFC 7871).
const EDNS_CLIENT_SUBNET: u16 = 8;

/// Build a recursion-desired query for the question, with an optional
/// CLIENT-SUBNET option attached.
pub fn build_query(question: &Question, ecs: Option<&EcsAddress>) -> Result<Vec<u8>, DnsError> {
    let name = Name::from_str(&question.name)
        .map_err(|e| DnsError::InvalidMessage(format!("Invalid name '{}': {}", question.name, e)))?;

    let mut query = Query::new();
    query.set_name(name);
    query.set_query_type(question.rtype.to_u16().into());
    query.set_query_class(DNSClass::IN);

    let mut message = Message::new();
    message.set_id(fastrand::u16(..));
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(query);

    let mut edns = hickory_proto::op::Edns::new();
    edns.set_max_payload(EDNS_MAX_PAYLOAD);
    edns.set_version(0);
    if let Some(ecs) = ecs {
        edns.options_mut().insert(
            hickory_proto::rr::rdata::opt::EdnsOption::Unknown(
                EDNS_CLIENT_SUBNET,
                ecs.option_payload(),
            ),
        );
    }
    message.set_edns(edns);

    serialize(&message)
}

pub fn serialize(message: &Message) -> Result<Vec<u8>, DnsError> {
    let mut buf = Vec::with_capacity(512);
    let mut encoder = BinEncoder::new(&mut buf);
    message
        .emit(&mut encoder)
        .map_err(|e| DnsError::InvalidMessage(format!("Failed to serialize message: {}", e)))?;
    Ok(buf)
}

/// Parse an upstream reply into the engine's reply model. OPT pseudo-records
/// are dropped from the additional section.
pub fn parse_reply(bytes: &[u8]) -> Result<DnsReply, DnsError> {
    let message = Message::from_vec(bytes)
        .map_err(|e| DnsError::InvalidMessage(format!("Failed to parse reply: {}", e)))?;

    Ok(DnsReply {
        rcode: rcode_from_wire(message.response_code()),
        authenticated: message.authentic_data(),
        recursion_available: message.recursion_available(),
        truncated: message.truncated(),
        answers: convert_records(message.answers()),
        authority: convert_records(message.name_servers()),
        additional: convert_records(message.additionals()),
    })
}

fn convert_records(records: &[Record]) -> Vec<ResourceRecord> {
    records.iter().filter_map(to_domain_record).collect()
}

fn to_domain_record(record: &Record) -> Option<ResourceRecord> {
    let rtype = RecordType::from_u16(u16::from(record.record_type()));
    if rtype == RecordType::Opt {
        return None;
    }

    let data = match record.data() {
        RData::A(a) => RecordData::A(a.0),
        RData::AAAA(aaaa) => RecordData::Aaaa(aaaa.0),
        RData::CNAME(canonical) => RecordData::Cname(normalize_name(&canonical.to_utf8())),
        other => match rdata_bytes(other) {
            Ok(bytes) => RecordData::Other(bytes),
            Err(e) => {
                debug!(error = %e, rtype = %rtype, "Dropping unencodable record");
                return None;
            }
        },
    };

    Some(ResourceRecord {
        name: normalize_name(&record.name().to_utf8()),
        rtype,
        class: u16::from(record.dns_class()),
        ttl: record.ttl(),
        data,
    })
}

/// Emit rdata with canonical (uncompressed) names so the bytes stay valid
/// when spliced into another message.
fn rdata_bytes(rdata: &RData) -> Result<Vec<u8>, DnsError> {
    let mut buf = Vec::with_capacity(64);
    let mut encoder = BinEncoder::new(&mut buf);
    encoder.set_canonical_names(true);
    rdata
        .emit(&mut encoder)
        .map_err(|e| DnsError::InvalidMessage(format!("Failed to encode rdata: {}", e)))?;
    Ok(buf)
}

fn to_wire_record(rr: &ResourceRecord) -> Result<Record, DnsError> {
    let name = Name::from_str(&rr.name)
        .map_err(|e| DnsError::InvalidMessage(format!("Invalid owner name '{}': {}", rr.name, e)))?;

    let rdata = match &rr.data {
        RecordData::A(ip) => RData::A(A(*ip)),
        RecordData::Aaaa(ip) => RData::AAAA(AAAA(*ip)),
        RecordData::Cname(target) => {
            let target = Name::from_str(target).map_err(|e| {
                DnsError::InvalidMessage(format!("Invalid CNAME target '{}': {}", target, e))
            })?;
            RData::CNAME(CNAME(target))
        }
        RecordData::Other(bytes) => RData::Unknown {
            code: hickory_proto::rr::RecordType::Unknown(rr.rtype.to_u16()),
            rdata: NULL::with(bytes.clone()),
        },
    };

    Ok(Record::from_rdata(name, rr.ttl, rdata))
}

/// Build the client-facing response message for a routed reply.
pub fn reply_message(
    id: u16,
    question: &Question,
    recursion_desired: bool,
    reply: &DnsReply,
) -> Result<Message, DnsError> {
    let name = Name::from_str(&question.name)
        .map_err(|e| DnsError::InvalidMessage(format!("Invalid name '{}': {}", question.name, e)))?;

    let mut query = Query::new();
    query.set_name(name);
    query.set_query_type(question.rtype.to_u16().into());
    query.set_query_class(DNSClass::IN);

    let mut message = Message::new();
    message.set_id(id);
    message.set_message_type(MessageType::Response);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(recursion_desired);
    message.set_recursion_available(reply.recursion_available);
    message.set_authentic_data(reply.authenticated);
    message.set_truncated(reply.truncated);
    message.set_response_code(rcode_to_wire(reply.rcode));
    message.add_query(query);

    for rr in &reply.answers {
        message.add_answer(to_wire_record(rr)?);
    }
    for rr in &reply.authority {
        message.add_name_server(to_wire_record(rr)?);
    }
    for rr in &reply.additional {
        message.add_additional(to_wire_record(rr)?);
    }

    Ok(message)
}

fn rcode_from_wire(rcode: ResponseCode) -> Rcode {
    match rcode {
        ResponseCode::NoError => Rcode::NoError,
        ResponseCode::FormErr => Rcode::FormErr,
        ResponseCode::ServFail => Rcode::ServFail,
        ResponseCode::NXDomain => Rcode::NxDomain,
        ResponseCode::NotImp => Rcode::NotImp,
        ResponseCode::Refused => Rcode::Refused,
        other => Rcode::Other(u16::from(other.low())),
    }
}

fn rcode_to_wire(rcode: Rcode) -> ResponseCode {
    match rcode {
        Rcode::NoError => ResponseCode::NoError,
        Rcode::FormErr => ResponseCode::FormErr,
        Rcode::ServFail => ResponseCode::ServFail,
        Rcode::NxDomain => ResponseCode::NXDomain,
        Rcode::NotImp => ResponseCode::NotImp,
        Rcode::Refused => ResponseCode::Refused,
        Rcode::Other(_) => ResponseCode::ServFail,
    }
}
