use haggle_llm::{ChatOptions, ChatRequest, ChatResponse, Content, Message};

#[test]
fn test_content_text_creation() {
    let content = Content::text("Hello, world!");
    assert_eq!(content.as_text(), Some("Hello, world!"));
}

#[test]
fn test_content_from_string() {
    let content: Content = "Test".into();
    assert_eq!(content.as_text(), Some("Test"));
}

#[test]
fn test_multipart_content_joins_text() {
    let json = r#"[{"type":"text","text":"{\"a\":"},{"type":"text","text":"1}"}]"#;
    let content: Content = serde_json::from_str(json).unwrap();
    assert_eq!(content.as_text(), None);
    assert_eq!(content.joined_text(), "{\"a\":1}");
}

#[test]
fn test_message_roles() {
    assert_eq!(Message::system("You are a pricing expert").role(), "system");
    assert_eq!(Message::human("Price my lamp").role(), "user");
    assert_eq!(Message::ai("About $20").role(), "assistant");
}

#[test]
fn test_message_serialization_human() {
    let msg = Message::human("Hello");
    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"role\":\"user\""));
    assert!(json.contains("Hello"));
}

#[test]
fn test_message_deserialization() {
    let json = r#"{"role":"user","content":"Test"}"#;
    let msg: Message = serde_json::from_str(json).unwrap();
    assert_eq!(msg.role(), "user");
    assert_eq!(msg.content().as_text(), Some("Test"));
}

#[test]
fn test_chat_request_with_options() {
    let options = ChatOptions::new().temperature(0.3).max_tokens(1000).json_mode(true);
    let request =
        ChatRequest::new("gemini-1.5-flash", vec![Message::human("Hi")]).with_options(options);

    assert_eq!(request.model, "gemini-1.5-flash");
    assert_eq!(request.options.temperature, Some(0.3));
    assert_eq!(request.options.max_tokens, Some(1000));
    assert!(request.options.json_mode);
}

#[test]
fn test_chat_options_default() {
    let options = ChatOptions::default();
    assert_eq!(options.temperature, None);
    assert_eq!(options.max_tokens, None);
    assert!(!options.json_mode);
}

#[test]
fn test_chat_response_text_helper() {
    let response = ChatResponse::text("ok");
    assert_eq!(response.content.as_deref(), Some("ok"));
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
}
