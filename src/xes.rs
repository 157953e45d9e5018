//! XES rendering of reconstructed traces.
//!
//! The document declares the standard `time` and `concept` extensions and
//! writes one `<trace>` per vehicle with its stop transitions as `<event>`s.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event as XmlEvent};

use crate::engine::{EVENT_NAME, Event, Trace};

const XES_NAMESPACE: &str = "http://www.xes-standard.org/";

/// `(name, prefix, uri)` of every extension the log declares.
const EXTENSIONS: &[(&str, &str, &str)] = &[
    ("Time", "time", "http://www.xes-standard.org/time.xesext"),
    ("Concept", "concept", "http://www.xes-standard.org/concept.xesext"),
];

/// ISO-8601 in UTC with millisecond precision, e.g. `2025-10-30T13:21:00.000Z`.
pub fn iso_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Renders a complete XES document for `log_name`.
///
/// Traces without events are left out.
pub fn render(log_name: &str, traces: &[Trace]) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);

    writer.write_event(XmlEvent::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer.write_event(XmlEvent::Start(BytesStart::new("log").with_attributes([
        ("xes.version", "1.0"),
        ("xes.features", "nested-attributes"),
        ("openxes.version", "1.0RC7"),
        ("xmlns", XES_NAMESPACE),
    ])))?;

    for (name, prefix, uri) in EXTENSIONS {
        writer.write_event(XmlEvent::Empty(BytesStart::new("extension").with_attributes([
            ("name", *name),
            ("prefix", *prefix),
            ("uri", *uri),
        ])))?;
    }

    attribute(&mut writer, "string", "concept:name", log_name)?;

    for trace in traces.iter().filter(|t| !t.events.is_empty()) {
        write_trace(&mut writer, trace)?;
    }

    writer.write_event(XmlEvent::End(BytesEnd::new("log")))?;

    let mut out = writer.into_inner();
    out.push(b'\n');
    Ok(out)
}

fn write_trace(writer: &mut Writer<Vec<u8>>, trace: &Trace) -> Result<()> {
    writer.write_event(XmlEvent::Start(BytesStart::new("trace")))?;

    attribute(writer, "string", "concept:name", &trace.id)?;
    attribute(writer, "string", "tripId", &trace.trip_id)?;
    attribute(writer, "string", "routeId", &trace.route_id)?;
    attribute(writer, "string", "lineName", &trace.line_name)?;

    for event in &trace.events {
        write_event(writer, event)?;
    }

    writer.write_event(XmlEvent::End(BytesEnd::new("trace")))?;
    Ok(())
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: &Event) -> Result<()> {
    writer.write_event(XmlEvent::Start(BytesStart::new("event")))?;

    attribute(writer, "string", "concept:name", EVENT_NAME)?;
    attribute(writer, "date", "time:timestamp", &iso_timestamp(&event.timestamp))?;
    attribute(writer, "int", "stopSequence", &event.stop_sequence.to_string())?;
    attribute(writer, "string", "stopId", &event.stop_id)?;
    attribute(writer, "string", "stopName", &event.stop_name)?;

    writer.write_event(XmlEvent::End(BytesEnd::new("event")))?;
    Ok(())
}

/// Writes a typed XES attribute such as `<string key=".." value=".."/>`.
fn attribute(writer: &mut Writer<Vec<u8>>, kind: &str, key: &str, value: &str) -> Result<()> {
    writer.write_event(XmlEvent::Empty(
        BytesStart::new(kind).with_attributes([("key", key), ("value", value)]),
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trace(events: Vec<Event>) -> Trace {
        Trace {
            id: "V1".into(),
            trip_id: "T1".into(),
            route_id: "R1".into(),
            line_name: "Line X (EN)".into(),
            events,
        }
    }

    fn sample_event() -> Event {
        Event {
            stop_sequence: 2,
            stop_id: "S2".into(),
            stop_name: "Stop B (EN)".into(),
            timestamp: DateTime::from_timestamp(200, 0).unwrap(),
        }
    }

    fn render_str(traces: &[Trace]) -> String {
        String::from_utf8(render("ToeiTrain", traces).unwrap()).unwrap()
    }

    #[test]
    fn test_iso_timestamp() {
        let ts = DateTime::from_timestamp(1761830460, 0).unwrap();
        assert_eq!(iso_timestamp(&ts), "2025-10-30T13:21:00.000Z");
    }

    #[test]
    fn test_header_and_extensions() {
        let xml = render_str(&[]);

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"xes.version="1.0""#));
        assert!(xml.contains(r#"xmlns="http://www.xes-standard.org/""#));
        assert!(xml.contains(
            r#"<extension name="Time" prefix="time" uri="http://www.xes-standard.org/time.xesext"/>"#
        ));
        assert!(xml.contains(
            r#"<extension name="Concept" prefix="concept" uri="http://www.xes-standard.org/concept.xesext"/>"#
        ));
        assert!(xml.contains(r#"<string key="concept:name" value="ToeiTrain"/>"#));
        assert!(!xml.contains("<trace>"));
        assert!(xml.trim_end().ends_with("</log>"));
    }

    #[test]
    fn test_trace_and_event_attributes() {
        let xml = render_str(&[sample_trace(vec![sample_event()])]);

        assert_eq!(xml.matches("<trace>").count(), 1);
        assert_eq!(xml.matches("<event>").count(), 1);
        assert!(xml.contains(r#"<string key="concept:name" value="V1"/>"#));
        assert!(xml.contains(r#"<string key="tripId" value="T1"/>"#));
        assert!(xml.contains(r#"<string key="routeId" value="R1"/>"#));
        assert!(xml.contains(r#"<string key="lineName" value="Line X (EN)"/>"#));
        assert!(xml.contains(r#"<string key="concept:name" value="currentStopSequenceChanged"/>"#));
        assert!(xml.contains(r#"<date key="time:timestamp" value="1970-01-01T00:03:20.000Z"/>"#));
        assert!(xml.contains(r#"<int key="stopSequence" value="2"/>"#));
        assert!(xml.contains(r#"<string key="stopId" value="S2"/>"#));
        assert!(xml.contains(r#"<string key="stopName" value="Stop B (EN)"/>"#));
    }

    #[test]
    fn test_trace_attributes_precede_events() {
        let xml = render_str(&[sample_trace(vec![sample_event()])]);

        let line_name = xml.find(r#"key="lineName""#).unwrap();
        let event = xml.find("<event>").unwrap();
        assert!(line_name < event);
    }

    #[test]
    fn test_events_keep_order() {
        let mut second = sample_event();
        second.stop_sequence = 3;
        second.stop_id = "S3".into();
        let xml = render_str(&[sample_trace(vec![sample_event(), second])]);

        let first_pos = xml.find(r#"value="S2""#).unwrap();
        let second_pos = xml.find(r#"value="S3""#).unwrap();
        assert!(first_pos < second_pos);
    }

    #[test]
    fn test_empty_traces_are_omitted() {
        let xml = render_str(&[sample_trace(vec![])]);
        assert!(!xml.contains("<trace>"));
    }

    #[test]
    fn test_values_are_escaped() {
        let mut event = sample_event();
        event.stop_name = r#"Bridge & "Tower""#.into();
        let xml = render_str(&[sample_trace(vec![event])]);

        assert!(xml.contains("Bridge &amp; &quot;Tower&quot;"));
    }
}
