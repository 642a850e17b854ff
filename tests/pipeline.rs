use sonolabel::annotate::{AnnotationEngine, Categories, CategoryDeletion, PointerButton};
use sonolabel::audio::{analyze, AnalysisParams, SampleBuffer};
use sonolabel::export::{self, ExportFormat};
use sonolabel::render::{ColorMap, ColorPreset, FrameRenderer, FrequencyScale, Viewport};
use sonolabel::view::{FieldState, ViewController, ViewEvent, ViewSettings};

const SAMPLE_RATE: u32 = 8000;

/// 1 kHz for the first two seconds, 3 kHz for the next two.
fn two_tone() -> SampleBuffer {
    let sr = SAMPLE_RATE as usize;
    let samples = (0..sr * 4)
        .map(|i| {
            let f = if i < sr * 2 { 1000.0 } else { 3000.0 };
            (2.0 * std::f32::consts::PI * f * i as f32 / sr as f32).sin()
        })
        .collect();
    SampleBuffer::new(samples, SAMPLE_RATE)
}

fn controller() -> ViewController {
    let settings = ViewSettings {
        window_seconds: 4.0,
        frequency_scale: FrequencyScale::Linear,
        ..ViewSettings::default()
    };
    let engine = AnnotationEngine::new(0.0, Categories::with_definitions([("Whistle", "#00ffff")]));
    let renderer = FrameRenderer::new(ColorMap::preset(ColorPreset::Magma), None);
    // 400 px plot: 100 px per second
    ViewController::new(settings, SAMPLE_RATE as f64 / 2.0, Viewport::new(448, 220), engine, renderer, 30)
}

#[test]
fn field_tracks_the_tone_change() {
    let field = analyze(&two_tone(), AnalysisParams::new(512, 256)).unwrap();
    assert_eq!(field.width(), (4 * 8000 - 512) / 256);
    assert_eq!(field.height(), 256);

    let early = field.column_at_time(0.5).unwrap();
    let late = field.column_at_time(3.5).unwrap();
    let low = field.row_at_frequency(1000.0);
    let high = field.row_at_frequency(3000.0);
    assert!(field.get(early, low).unwrap() > field.get(early, high).unwrap());
    assert!(field.get(late, high).unwrap() > field.get(late, low).unwrap());
}

#[test]
fn label_session_round_trip() {
    let mut c = controller();
    c.load(two_tone(), AnalysisParams::new(512, 256)).unwrap();
    assert!(matches!(c.wait_for_field(), FieldState::Ready(_)));
    c.drain_events();

    // draw a label over the first tone
    c.engine_mut().set_active_category("1").unwrap();
    c.pointer_down(48.0 + 50.0, 10.0, PointerButton::Primary);
    c.pointer_move(48.0 + 120.0, 10.0);
    c.pointer_up(48.0 + 150.0, 10.0);
    let id = c.engine().labels()[0].id;
    assert!(c.drain_events().contains(&ViewEvent::EditLabel(id)));
    assert_eq!(c.engine().labels()[0].text, "Whistle");

    // and a custom one, renamed by the user
    let custom = c.engine_mut().add_label(2.2, 3.0, "0", None).unwrap();
    c.set_label_text(custom, "chirp");
    c.commit_label_text(custom);

    let first = c.render();
    let second = c.render();
    assert_eq!(first, second);

    let records = export::records(c.engine());
    let audacity = export::write_labels(&records, ExportFormat::Audacity).unwrap();
    assert_eq!(audacity, "0.500000\t1.500000\tWhistle\n2.200000\t3.000000\tchirp\n");

    let json = export::write_labels(&records, ExportFormat::Json).unwrap();
    let mut reloaded = AnnotationEngine::new(4.0, Categories::with_definitions([("Whistle", "#00ffff")]));
    let report = export::import_records(&mut reloaded, &export::parse_json(&json).unwrap());
    assert_eq!(report.imported, 2);
    assert_eq!(reloaded.labels_by_start()[0].config_id, "1");

    // dropping the category keeps the label under the default one
    let moved = reloaded.delete_category("1", CategoryDeletion::Reassign).unwrap();
    assert_eq!(moved, 1);
    assert!(reloaded.labels().iter().all(|l| l.config_id == "0"));
}

#[test]
fn failed_analysis_still_allows_labelling() {
    let mut c = controller();
    c.load(SampleBuffer::new(vec![0.0; 100], SAMPLE_RATE), AnalysisParams::new(512, 256))
        .unwrap();
    assert!(matches!(c.wait_for_field(), FieldState::Unavailable(_)));

    let frame = c.render();
    assert_eq!(frame.pixels.len(), 448 * 220 * 4);

    // 100 samples is 12.5 ms of audio: labels clamp into it or are refused
    assert!(c.engine_mut().add_label(0.0, 1.0, "0", Some("x".into())).is_ok());
    assert!(c.engine_mut().add_label(0.5, 1.0, "0", Some("y".into())).is_err());
}
