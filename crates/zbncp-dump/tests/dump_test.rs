//! End-to-end tests: capture text in, rendered lines out.

use zbncp_dump::{run, CaptureMode, DumpConfig, DumpError, InputFormat, OutputFormat};
use zbncp_link::{fragment_message, Envelope, Frame, FrameFlags, SeqNum, Status};

fn hex_line(prefix: &str, frame: &Frame) -> String {
    format!("{} {}\n", prefix, hex::encode(frame.encode()))
}

fn run_to_lines(capture: &str, config: &DumpConfig) -> (Vec<String>, zbncp_dump::DumpSummary) {
    let mut out = Vec::new();
    let summary = run(capture.as_bytes().to_vec(), config, &mut out).expect("capture should decode");
    let text = String::from_utf8(out).expect("output should be UTF-8");
    (text.lines().map(str::to_string).collect(), summary)
}

#[test]
fn test_request_response_exchange() {
    let request = Envelope::request(0x0009, 1, Vec::new()).encode();
    let response = Envelope::response(0x0009, 1, Status::OK, vec![0xCD, 0xAB]).encode();

    let mut capture = String::from("# GET_PAN_ID\n");
    let request = Frame::data(1, FrameFlags::single(SeqNum::new(0)), request).expect("body fits one frame");
    let response = Frame::data(1, FrameFlags::single(SeqNum::new(0)), response).expect("body fits one frame");
    capture.push_str(&hex_line(">", &request));
    capture.push_str(&hex_line("<", &Frame::ack(1, SeqNum::new(0))));
    capture.push_str(&hex_line("<", &response));

    let (lines, summary) = run_to_lines(&capture, &DumpConfig::default());
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("host -> ncp: DATA"));
    assert!(lines[0].contains("REQUEST 0x0009 GET_PAN_ID tsn=1"));
    assert!(lines[1].starts_with("ncp -> host: ACK ack_seq=0"));
    assert!(lines[2].contains("status=[GENERIC: OK] pan_id=0xABCD"));

    assert_eq!(summary.records, 3);
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.messages, 2);
    assert_eq!(summary.malformed, 0);
}

#[test]
fn test_fragmented_message_split_across_records() {
    let message = Envelope::indication(0x0223, vec![0x11; 11]).encode();
    let wire: Vec<u8> = fragment_message(&message, 5, 2, SeqNum::new(1))
        .iter()
        .flat_map(|frame| frame.encode().to_vec())
        .collect();

    let capture: String = wire
        .chunks(4)
        .map(|chunk| format!("< {}\n", hex::encode(chunk)))
        .collect();

    let (lines, summary) = run_to_lines(&capture, &DumpConfig::default());
    assert_eq!(summary.frames, 4);
    assert_eq!(summary.messages, 1);
    let last = lines.last().expect("at least one line");
    assert!(last.contains("INDICATION 0x0223 ZDO_DEV_ANNCE_IND nwk_addr=0x1111"));
    assert!(last.contains("(4 fragments)"));
}

#[test]
fn test_malformed_and_unterminated_are_reported() {
    let mut corrupted = Frame::ack(1, SeqNum::new(2));
    corrupted.header.crc ^= 0xFF;
    let opening = FrameFlags {
        first_fragment: true,
        send_seq: SeqNum::new(1),
        ..Default::default()
    };
    let partial = Envelope::request(0x0401, 3, vec![0; 16]).encode();

    let mut capture = hex_line(">", &corrupted);
    let opening = Frame::data(1, opening, partial.slice(..10)).expect("body fits one frame");
    capture.push_str(&hex_line(">", &opening));

    let (lines, summary) = run_to_lines(&capture, &DumpConfig::default());
    assert!(lines[0].contains("malformed: header CRC mismatch"));
    assert!(lines[2].contains("unterminated fragment: 10 bytes from 1 frame(s) of REQUEST 0x0401"));
    assert_eq!(summary.malformed, 1);
    assert_eq!(summary.unterminated, 1);
}

#[test]
fn test_datagram_mode_leaves_foreign_bytes() {
    let config = DumpConfig {
        mode: CaptureMode::Datagram,
        ..Default::default()
    };
    let (lines, summary) = run_to_lines("> 4500001c\n", &config);
    assert_eq!(lines, vec!["host -> ncp: not ZBNCP (4 bytes): 4500001c".to_string()]);
    assert_eq!(summary.frames, 0);
}

#[test]
fn test_json_output() {
    let config = DumpConfig {
        output: OutputFormat::Json,
        ..Default::default()
    };
    let message = Envelope::request(0x0002, 0, vec![0x01]).encode();
    let frame = Frame::data(1, FrameFlags::single(SeqNum::new(0)), message).expect("body fits one frame");
    let capture = hex_line(">", &frame);

    let (lines, _) = run_to_lines(&capture, &config);
    let value: serde_json::Value = serde_json::from_str(&lines[0]).expect("valid JSON");
    assert_eq!(value["event"], "frame");
    assert_eq!(value["dst"], "ncp");
    assert_eq!(value["outcome"]["command"], "NCP_RESET");
    assert_eq!(value["outcome"]["fields"][0]["value"], "1");
}

#[test]
fn test_raw_input_with_custom_endpoints() {
    let config = DumpConfig::from_yaml_str("input: raw\nhost: zc\nncp: radio\n").expect("valid YAML");
    assert_eq!(config.input, InputFormat::Raw);

    let message = Envelope::request(0x0004, 9, Vec::new()).encode();
    let mut input = vec![0x00, 0x00];
    let frame = Frame::data(1, FrameFlags::single(SeqNum::new(0)), message).expect("body fits one frame");
    input.extend_from_slice(&frame.encode());

    let mut out = Vec::new();
    let summary = run(input, &config, &mut out).expect("capture should decode");
    let text = String::from_utf8(out).expect("output should be UTF-8");
    assert!(text.starts_with("zc -> radio: skipped 2 bytes: 0000"));
    assert!(text.contains("GET_ZIGBEE_ROLE"));
    assert_eq!(summary.messages, 1);
}

#[test]
fn test_bad_capture_line() {
    let mut out = Vec::new();
    let err = run(b"> de ad\n> zz\n".to_vec(), &DumpConfig::default(), &mut out)
        .expect_err("invalid hex should fail");
    assert!(matches!(err, DumpError::Hex { line: 2, .. }));
}
