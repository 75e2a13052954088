//! # Event Decoder
//!
//! ABI decoding of `TopicCreated` / `ReplyCreated` logs into records.
//!
//! Indexed parameters come from log topics, `(uint256 timestamp, string content)`
//! from log data. Block number and transaction hash come from the log envelope.

use crate::domain::{Address, EventKind, RawLog, ReplyRecord, RetrievalError, TopicRecord};
use primitive_types::{H256, U256};

const WORD: usize = 32;

/// Decode a `TopicCreated` log.
pub fn decode_topic(log: &RawLog) -> Result<TopicRecord, RetrievalError> {
    check_envelope(log, EventKind::TopicCreated)?;
    let (timestamp, content) = decode_body(&log.data)?;

    Ok(TopicRecord {
        topic_id: word_to_u64(&log.topics[1], "topicId")?,
        author: Address::from_word(&log.topics[2]),
        timestamp,
        content,
        block_number: log.block_number,
        transaction_hash: tx_hash_hex(&log.transaction_hash),
    })
}

/// Decode a `ReplyCreated` log.
pub fn decode_reply(log: &RawLog) -> Result<ReplyRecord, RetrievalError> {
    check_envelope(log, EventKind::ReplyCreated)?;
    let (timestamp, content) = decode_body(&log.data)?;

    Ok(ReplyRecord {
        reply_id: word_to_u64(&log.topics[1], "replyId")?,
        topic_id: word_to_u64(&log.topics[2], "topicId")?,
        author: Address::from_word(&log.topics[3]),
        timestamp,
        content,
        block_number: log.block_number,
        transaction_hash: tx_hash_hex(&log.transaction_hash),
    })
}

/// ABI-encode `(uint256 timestamp, string content)` as a log data payload.
pub fn encode_body(timestamp: u64, content: &str) -> Vec<u8> {
    let bytes = content.as_bytes();
    let padded = bytes.len().div_ceil(WORD) * WORD;

    let mut out = Vec::with_capacity(3 * WORD + padded);
    out.extend_from_slice(&u64_word(timestamp));
    out.extend_from_slice(&u64_word(2 * WORD as u64));
    out.extend_from_slice(&u64_word(bytes.len() as u64));
    out.extend_from_slice(bytes);
    out.resize(3 * WORD + padded, 0);
    out
}

/// 32-byte big-endian word holding `value`.
pub fn u64_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn check_envelope(log: &RawLog, kind: EventKind) -> Result<(), RetrievalError> {
    let expected = 1 + kind.indexed_count();
    if log.topics.len() != expected {
        return Err(RetrievalError::Decode(format!(
            "{} log in tx {} has {} topics, expected {}",
            kind,
            tx_hash_hex(&log.transaction_hash),
            log.topics.len(),
            expected
        )));
    }
    if log.topics[0] != kind.topic0() {
        return Err(RetrievalError::Decode(format!(
            "log in tx {} is not a {} event",
            tx_hash_hex(&log.transaction_hash),
            kind
        )));
    }
    Ok(())
}

fn decode_body(data: &[u8]) -> Result<(u64, String), RetrievalError> {
    let timestamp = read_u64(data, 0, "timestamp")?;

    let offset = read_usize(data, WORD, "content offset")?;
    let len = read_usize(data, offset, "content length")?;
    let start = offset
        .checked_add(WORD)
        .ok_or_else(|| RetrievalError::Decode("content offset overflow".to_string()))?;
    let end = start
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| {
            RetrievalError::Decode(format!(
                "content of {} bytes at offset {} exceeds data length {}",
                len,
                start,
                data.len()
            ))
        })?;

    let content = String::from_utf8_lossy(&data[start..end]).into_owned();
    Ok((timestamp, content))
}

fn read_word(data: &[u8], at: usize, field: &str) -> Result<U256, RetrievalError> {
    data.get(at..at.saturating_add(WORD))
        .filter(|w| w.len() == WORD)
        .map(U256::from_big_endian)
        .ok_or_else(|| {
            RetrievalError::Decode(format!(
                "{} word at offset {} beyond data length {}",
                field,
                at,
                data.len()
            ))
        })
}

fn read_u64(data: &[u8], at: usize, field: &str) -> Result<u64, RetrievalError> {
    u256_to_u64(read_word(data, at, field)?, field)
}

fn read_usize(data: &[u8], at: usize, field: &str) -> Result<usize, RetrievalError> {
    let value = read_u64(data, at, field)?;
    usize::try_from(value)
        .map_err(|_| RetrievalError::Decode(format!("{} {} does not fit in usize", field, value)))
}

fn word_to_u64(word: &H256, field: &str) -> Result<u64, RetrievalError> {
    u256_to_u64(U256::from_big_endian(word.as_bytes()), field)
}

fn u256_to_u64(value: U256, field: &str) -> Result<u64, RetrievalError> {
    if value > U256::from(u64::MAX) {
        return Err(RetrievalError::Decode(format!(
            "{} {} exceeds 64 bits",
            field, value
        )));
    }
    Ok(value.as_u64())
}

fn tx_hash_hex(hash: &H256) -> String {
    format!("0x{}", hex::encode(hash.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(value: u64) -> H256 {
        H256::from(u64_word(value))
    }

    fn author_word() -> H256 {
        let mut w = [0u8; 32];
        w[12..].copy_from_slice(&[0x11; 20]);
        H256::from(w)
    }

    fn topic_log(id: u64, ts: u64, content: &str) -> RawLog {
        RawLog {
            topics: vec![EventKind::TopicCreated.topic0(), word(id), author_word()],
            data: encode_body(ts, content),
            block_number: 419_912_300,
            transaction_hash: H256::from([0xab; 32]),
        }
    }

    #[test]
    fn test_decode_topic() {
        let record = decode_topic(&topic_log(5, 1_761_000_000, "gm chain")).unwrap();
        assert_eq!(record.topic_id, 5);
        assert_eq!(record.timestamp, 1_761_000_000);
        assert_eq!(record.content, "gm chain");
        assert_eq!(record.block_number, 419_912_300);
        assert_eq!(record.transaction_hash, format!("0x{}", "ab".repeat(32)));
        assert_eq!(record.author.to_lower_hex(), format!("0x{}", "11".repeat(20)));
    }

    #[test]
    fn test_decode_reply() {
        let log = RawLog {
            topics: vec![
                EventKind::ReplyCreated.topic0(),
                word(9),
                word(5),
                author_word(),
            ],
            data: encode_body(42, "long reply that spans more than one abi word of content"),
            block_number: 7,
            transaction_hash: H256::zero(),
        };
        let record = decode_reply(&log).unwrap();
        assert_eq!(record.reply_id, 9);
        assert_eq!(record.topic_id, 5);
        assert_eq!(record.timestamp, 42);
        assert!(record.content.starts_with("long reply"));
    }

    #[test]
    fn test_decode_empty_content() {
        let record = decode_topic(&topic_log(1, 1, "")).unwrap();
        assert_eq!(record.content, "");
    }

    #[test]
    fn test_decode_multibyte_content() {
        let record = decode_topic(&topic_log(1, 1, "链上对话")).unwrap();
        assert_eq!(record.content, "链上对话");
    }

    #[test]
    fn test_wrong_event_selector() {
        let mut log = topic_log(1, 1, "x");
        log.topics[0] = EventKind::ReplyCreated.topic0();
        assert!(matches!(decode_topic(&log), Err(RetrievalError::Decode(_))));
    }

    #[test]
    fn test_wrong_topic_count() {
        let log = topic_log(1, 1, "x");
        assert!(decode_reply(&log).is_err());
    }

    #[test]
    fn test_truncated_data() {
        let mut log = topic_log(1, 1, "some content");
        log.data.truncate(80);
        assert!(matches!(decode_topic(&log), Err(RetrievalError::Decode(_))));
    }

    #[test]
    fn test_id_overflow() {
        let mut log = topic_log(1, 1, "x");
        log.topics[1] = H256::from([0xff; 32]);
        let err = decode_topic(&log).unwrap_err();
        assert!(err.to_string().contains("topicId"));
    }

    #[test]
    fn test_encode_body_layout() {
        let data = encode_body(1, "abc");
        assert_eq!(data.len(), 4 * WORD);
        assert_eq!(data[WORD * 2 - 1], 64);
        assert_eq!(data[WORD * 3 - 1], 3);
        assert_eq!(&data[WORD * 3..WORD * 3 + 3], b"abc");
    }
}
