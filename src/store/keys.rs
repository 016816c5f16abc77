use crate::store::StoreError;

/// Reject key components that are empty or contain the `:` separator,
/// which would make composite keys ambiguous.
fn ensure_component(value: &str, what: &str) -> Result<(), StoreError> {
    if value.is_empty() || value.contains(':') {
        return Err(StoreError::Validation(format!(
            "invalid {what}: {value:?}"
        )));
    }
    Ok(())
}

pub fn user_key(user_id: &str) -> Result<String, StoreError> {
    ensure_component(user_id, "user id")?;
    Ok(user_id.to_string())
}

pub fn user_email_index_key(email: &str) -> String {
    format!("email:{}", email.to_lowercase())
}

pub fn session_key(token_hash: &str) -> Result<String, StoreError> {
    ensure_component(token_hash, "token hash")?;
    Ok(token_hash.to_string())
}

pub fn session_user_index_key(user_id: &str, token_hash: &str) -> Result<String, StoreError> {
    ensure_component(user_id, "user id")?;
    ensure_component(token_hash, "token hash")?;
    Ok(format!("user:{user_id}:{token_hash}"))
}

pub fn session_user_index_prefix(user_id: &str) -> Result<String, StoreError> {
    ensure_component(user_id, "user id")?;
    Ok(format!("user:{user_id}:"))
}

pub fn course_key(course_id: &str) -> Result<String, StoreError> {
    ensure_component(course_id, "course id")?;
    Ok(course_id.to_string())
}

pub fn module_key(module_id: &str) -> Result<String, StoreError> {
    ensure_component(module_id, "module id")?;
    Ok(module_id.to_string())
}

/// Index key ordering modules of a course by `order_index`.
pub fn module_course_index_key(
    course_id: &str,
    order_index: u32,
    module_id: &str,
) -> Result<String, StoreError> {
    ensure_component(course_id, "course id")?;
    ensure_component(module_id, "module id")?;
    Ok(format!("{course_id}:{order_index:06}:{module_id}"))
}

pub fn module_course_index_prefix(course_id: &str) -> Result<String, StoreError> {
    ensure_component(course_id, "course id")?;
    Ok(format!("{course_id}:"))
}

pub fn lesson_key(lesson_id: &str) -> Result<String, StoreError> {
    ensure_component(lesson_id, "lesson id")?;
    Ok(lesson_id.to_string())
}

/// Index key ordering lessons of a module by `order_index`.
pub fn lesson_module_index_key(
    module_id: &str,
    order_index: u32,
    lesson_id: &str,
) -> Result<String, StoreError> {
    ensure_component(module_id, "module id")?;
    ensure_component(lesson_id, "lesson id")?;
    Ok(format!("{module_id}:{order_index:06}:{lesson_id}"))
}

pub fn lesson_module_index_prefix(module_id: &str) -> Result<String, StoreError> {
    ensure_component(module_id, "module id")?;
    Ok(format!("{module_id}:"))
}

pub fn quiz_key(quiz_id: &str) -> Result<String, StoreError> {
    ensure_component(quiz_id, "quiz id")?;
    Ok(quiz_id.to_string())
}

/// One quiz per lesson; index entry maps the lesson to its quiz id.
pub fn quiz_lesson_index_key(lesson_id: &str) -> Result<String, StoreError> {
    ensure_component(lesson_id, "lesson id")?;
    Ok(format!("lesson:{lesson_id}"))
}

pub fn enrollment_key(student_id: &str, course_id: &str) -> Result<String, StoreError> {
    ensure_component(student_id, "student id")?;
    ensure_component(course_id, "course id")?;
    Ok(format!("{student_id}:{course_id}"))
}

pub fn enrollment_student_prefix(student_id: &str) -> Result<String, StoreError> {
    ensure_component(student_id, "student id")?;
    Ok(format!("{student_id}:"))
}

pub fn lesson_progress_key(student_id: &str, lesson_id: &str) -> Result<String, StoreError> {
    ensure_component(student_id, "student id")?;
    ensure_component(lesson_id, "lesson id")?;
    Ok(format!("{student_id}:{lesson_id}"))
}

/// Attempts are keyed newest-first so a prefix scan lists by recency.
pub fn attempt_key(
    student_id: &str,
    quiz_id: &str,
    timestamp_ms: i64,
    attempt_id: &str,
) -> Result<String, StoreError> {
    ensure_component(student_id, "student id")?;
    ensure_component(quiz_id, "quiz id")?;
    ensure_component(attempt_id, "attempt id")?;
    let ts = timestamp_ms.max(0) as u64;
    let reverse_ts = u64::MAX - ts;
    Ok(format!("{student_id}:{quiz_id}:{reverse_ts:020}:{attempt_id}"))
}

pub fn attempt_prefix(student_id: &str, quiz_id: &str) -> Result<String, StoreError> {
    ensure_component(student_id, "student id")?;
    ensure_component(quiz_id, "quiz id")?;
    Ok(format!("{student_id}:{quiz_id}:"))
}

/// Canonical id for a two-party conversation: the sorted user-id pair.
fn conversation_id(user_a: &str, user_b: &str) -> (String, String) {
    if user_a <= user_b {
        (user_a.to_string(), user_b.to_string())
    } else {
        (user_b.to_string(), user_a.to_string())
    }
}

/// Messages of a conversation are keyed oldest-first.
pub fn message_key(
    user_a: &str,
    user_b: &str,
    timestamp_ms: i64,
    message_id: &str,
) -> Result<String, StoreError> {
    ensure_component(user_a, "user id")?;
    ensure_component(user_b, "user id")?;
    ensure_component(message_id, "message id")?;
    let (lo, hi) = conversation_id(user_a, user_b);
    let ts = timestamp_ms.max(0) as u64;
    Ok(format!("{lo}:{hi}:{ts:020}:{message_id}"))
}

pub fn message_conversation_prefix(user_a: &str, user_b: &str) -> Result<String, StoreError> {
    ensure_component(user_a, "user id")?;
    ensure_component(user_b, "user id")?;
    let (lo, hi) = conversation_id(user_a, user_b);
    Ok(format!("{lo}:{hi}:"))
}

/// Per-recipient inbox index keyed newest-first; the value is the sender id.
pub fn inbox_key(
    recipient_id: &str,
    timestamp_ms: i64,
    message_id: &str,
) -> Result<String, StoreError> {
    ensure_component(recipient_id, "recipient id")?;
    ensure_component(message_id, "message id")?;
    let ts = timestamp_ms.max(0) as u64;
    let reverse_ts = u64::MAX - ts;
    Ok(format!("{recipient_id}:{reverse_ts:020}:{message_id}"))
}

pub fn inbox_prefix(recipient_id: &str) -> Result<String, StoreError> {
    ensure_component(recipient_id, "recipient id")?;
    Ok(format!("{recipient_id}:"))
}

/// Parse the timestamp back out of an inbox key.
pub fn parse_inbox_timestamp_ms(key: &[u8]) -> Option<i64> {
    let first_sep = key.iter().position(|b| *b == b':')?;
    let tail = &key[first_sep + 1..];
    let second_sep = tail.iter().position(|b| *b == b':')?;
    let reverse_ts_str = std::str::from_utf8(&tail[..second_sep]).ok()?;
    let reverse_ts = reverse_ts_str.parse::<u64>().ok()?;
    let ts_u64 = u64::MAX.checked_sub(reverse_ts)?;
    i64::try_from(ts_u64).ok()
}

pub fn live_session_key(session_id: &str) -> Result<String, StoreError> {
    ensure_component(session_id, "live session id")?;
    Ok(session_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_keys_order_by_time_desc() {
        let newer = attempt_key("s1", "q1", 2000, "a2").unwrap();
        let older = attempt_key("s1", "q1", 1000, "a1").unwrap();
        assert!(newer < older);
    }

    #[test]
    fn message_keys_order_by_time_asc() {
        let older = message_key("s1", "t1", 1000, "m1").unwrap();
        let newer = message_key("s1", "t1", 2000, "m2").unwrap();
        assert!(older < newer);
    }

    #[test]
    fn conversation_prefix_is_symmetric() {
        let ab = message_conversation_prefix("alice", "bob").unwrap();
        let ba = message_conversation_prefix("bob", "alice").unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn inbox_timestamp_round_trips() {
        let key = inbox_key("r1", 123_456, "m1").unwrap();
        assert_eq!(parse_inbox_timestamp_ms(key.as_bytes()), Some(123_456));
    }

    #[test]
    fn email_index_is_normalized() {
        assert_eq!(user_email_index_key("A@Ex.com"), "email:a@ex.com");
    }

    #[test]
    fn component_with_separator_rejected() {
        assert!(lesson_progress_key("s:1", "l1").is_err());
        assert!(lesson_progress_key("", "l1").is_err());
    }
}
