use adaptation_core::models::{
    AdaptationFields, HeaderValue, InboundMessage, DEFAULT_GENERATE_REPORT,
    HEADER_FILE_ID, HEADER_GENERATE_REPORT, HEADER_REBUILT_FILE_LOCATION,
    HEADER_SOURCE_FILE_LOCATION,
};
use adaptation_core::ValidationError;

/// 校验消息头并提取请求字段
///
/// 三个必需消息头必须存在且为字符串；`generate-report` 缺失时取 `"false"`。
pub fn extract_fields(message: &InboundMessage) -> Result<AdaptationFields, ValidationError> {
    let file_id = required_string(message, HEADER_FILE_ID)?;
    let source_file_location = required_string(message, HEADER_SOURCE_FILE_LOCATION)?;
    let rebuilt_file_location = required_string(message, HEADER_REBUILT_FILE_LOCATION)?;

    let generate_report = match message.header(HEADER_GENERATE_REPORT) {
        None => DEFAULT_GENERATE_REPORT.to_string(),
        Some(value) => string_value(HEADER_GENERATE_REPORT, value)?,
    };

    Ok(AdaptationFields {
        file_id,
        source_file_location,
        rebuilt_file_location,
        generate_report,
    })
}

fn required_string(message: &InboundMessage, key: &'static str) -> Result<String, ValidationError> {
    let value = message
        .header(key)
        .ok_or(ValidationError::MissingHeader { key })?;
    string_value(key, value)
}

fn string_value(key: &'static str, value: &HeaderValue) -> Result<String, ValidationError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ValidationError::WrongType {
            key,
            found: value.type_name().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_with(headers: &[(&str, HeaderValue)]) -> InboundMessage {
        let mut message = InboundMessage::new(1);
        for (key, value) in headers {
            message.headers.insert(key.to_string(), value.clone());
        }
        message
    }

    fn valid_headers() -> Vec<(&'static str, HeaderValue)> {
        vec![
            (HEADER_FILE_ID, "abc".into()),
            (HEADER_SOURCE_FILE_LOCATION, "/in/abc".into()),
            (HEADER_REBUILT_FILE_LOCATION, "/out/abc".into()),
        ]
    }

    #[test]
    fn test_extracts_required_fields() {
        let fields = extract_fields(&message_with(&valid_headers())).unwrap();
        assert_eq!(fields.file_id, "abc");
        assert_eq!(fields.source_file_location, "/in/abc");
        assert_eq!(fields.rebuilt_file_location, "/out/abc");
        assert_eq!(fields.generate_report, "false");
    }

    #[test]
    fn test_absent_report_flag_equals_explicit_false() {
        let mut headers = valid_headers();
        let implicit = extract_fields(&message_with(&headers)).unwrap();

        headers.push((HEADER_GENERATE_REPORT, "false".into()));
        let explicit = extract_fields(&message_with(&headers)).unwrap();

        assert_eq!(implicit, explicit);
    }

    #[test]
    fn test_report_flag_is_passed_through() {
        let mut headers = valid_headers();
        headers.push((HEADER_GENERATE_REPORT, "true".into()));

        let fields = extract_fields(&message_with(&headers)).unwrap();
        assert_eq!(fields.generate_report, "true");
    }

    #[test]
    fn test_each_missing_required_header_is_reported() {
        for missing in [
            HEADER_FILE_ID,
            HEADER_SOURCE_FILE_LOCATION,
            HEADER_REBUILT_FILE_LOCATION,
        ] {
            let headers: Vec<_> = valid_headers()
                .into_iter()
                .filter(|(key, _)| *key != missing)
                .collect();

            let err = extract_fields(&message_with(&headers)).unwrap_err();
            assert_eq!(err, ValidationError::MissingHeader { key: missing });
        }
    }

    #[test]
    fn test_non_string_header_is_wrong_type() {
        let mut headers = valid_headers();
        headers[0] = (HEADER_FILE_ID, HeaderValue::Int(42));

        let err = extract_fields(&message_with(&headers)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::WrongType {
                key: HEADER_FILE_ID,
                found: "int".to_string(),
            }
        );
    }

    #[test]
    fn test_boolean_report_flag_is_wrong_type() {
        let mut headers = valid_headers();
        headers.push((HEADER_GENERATE_REPORT, HeaderValue::Bool(true)));

        let err = extract_fields(&message_with(&headers)).unwrap_err();
        assert!(matches!(err, ValidationError::WrongType { key, .. } if key == HEADER_GENERATE_REPORT));
    }
}
