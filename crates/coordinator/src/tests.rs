use super::*;
use overmark_anchor::{PageLayout, ScreenRect};
use overmark_model::tools::{default_tools, find_tool};
use overmark_model::AnnotationKind;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct SurfaceLog {
    sidebar: Vec<AnnotationId>,
    sidebar_open: bool,
    sidebar_selected: Vec<AnnotationId>,
    sidebar_updated: Vec<AnnotationId>,
    menu_open_for: Option<AnnotationId>,
    connector_for: Option<AnnotationId>,
    popbar_open: bool,
    toolbar_active: Vec<Option<String>>,
    toolbar_styles: Vec<(AnnotationKind, StylePatch)>,
    toolbar_sidebar_toggled: Vec<bool>,
    toasts: Vec<(Severity, String)>,
    modals: Vec<String>,
}

type SharedLog = Arc<Mutex<SurfaceLog>>;

struct FakeMenu(SharedLog);

impl MenuSurface for FakeMenu {
    fn open(&mut self, annotation: &Annotation, _anchor: overmark_anchor::Anchor) {
        self.0.lock().unwrap().menu_open_for = Some(annotation.id.clone());
    }

    fn close(&mut self) {
        self.0.lock().unwrap().menu_open_for = None;
    }
}

struct FakePopbar(SharedLog);

impl PopbarSurface for FakePopbar {
    fn open(&mut self, _selection: &TextSelection, _anchor: overmark_anchor::Anchor) {
        self.0.lock().unwrap().popbar_open = true;
    }

    fn close(&mut self) {
        self.0.lock().unwrap().popbar_open = false;
    }
}

struct FakeSidebar(SharedLog);

impl SidebarSurface for FakeSidebar {
    fn append(&mut self, annotation: &Annotation) {
        self.0.lock().unwrap().sidebar.push(annotation.id.clone());
    }

    fn remove(&mut self, id: &AnnotationId) {
        self.0.lock().unwrap().sidebar.retain(|existing| existing != id);
    }

    fn update_in_place(&mut self, annotation: &Annotation) {
        self.0.lock().unwrap().sidebar_updated.push(annotation.id.clone());
    }

    fn select(&mut self, annotation: &Annotation, _from_user_click: bool) {
        self.0.lock().unwrap().sidebar_selected.push(annotation.id.clone());
    }

    fn set_open(&mut self, open: bool) {
        self.0.lock().unwrap().sidebar_open = open;
    }

    fn clear(&mut self) {
        self.0.lock().unwrap().sidebar.clear();
    }
}

struct FakeConnector(SharedLog);

impl ConnectorSurface for FakeConnector {
    fn draw(&mut self, annotation: &Annotation, _anchor: &overmark_anchor::Anchor) {
        self.0.lock().unwrap().connector_for = Some(annotation.id.clone());
    }

    fn clear(&mut self) {
        self.0.lock().unwrap().connector_for = None;
    }
}

struct FakeToolbar(SharedLog);

impl ToolbarSurface for FakeToolbar {
    fn set_active_tool(&mut self, tool: Option<&ToolDefinition>) {
        self.0.lock().unwrap().toolbar_active.push(tool.map(|tool| tool.name.clone()));
    }

    fn update_tool_style(&mut self, kind: AnnotationKind, patch: &StylePatch) {
        self.0.lock().unwrap().toolbar_styles.push((kind, patch.clone()));
    }

    fn set_sidebar_toggled(&mut self, open: bool) {
        self.0.lock().unwrap().toolbar_sidebar_toggled.push(open);
    }
}

struct FakeNotifier(SharedLog);

impl Notifier for FakeNotifier {
    fn toast(&self, severity: Severity, message: &str) {
        self.0.lock().unwrap().toasts.push((severity, message.to_owned()));
    }

    fn modal_error(&self, message: &str) {
        self.0.lock().unwrap().modals.push(message.to_owned());
    }
}

#[derive(Default)]
struct FakePainter {
    items: Vec<Annotation>,
    active_tool: Option<String>,
    payloads: Vec<Option<String>>,
    selected: Vec<AnnotationId>,
    highlighted: Vec<AnnotationId>,
    prepared_pages: Vec<u32>,
    init_calls: usize,
}

impl Painter for FakePainter {
    fn prepare_page(&mut self, page_number: u32) {
        self.prepared_pages.push(page_number);
    }

    fn activate_tool(&mut self, tool: Option<&ToolDefinition>, payload: Option<&str>) {
        self.active_tool = tool.map(|tool| tool.name.clone());
        self.payloads.push(payload.map(str::to_owned));
    }

    fn select_annotation(&mut self, id: &AnnotationId) {
        self.selected.push(id.clone());
    }

    fn highlight(&mut self, annotation: &Annotation) {
        self.highlighted.push(annotation.id.clone());
    }

    fn highlight_range(&mut self, selection: &TextSelection) {
        let mut annotation = Annotation::new(selection.page_number, AnnotationKind::Highlight, "t");
        annotation.rect = selection.rect;
        self.items.push(annotation);
    }

    fn init_annotations(&mut self, items: Vec<Annotation>, include_document_annotations: bool) {
        self.init_calls += 1;
        self.items = items;
        if !include_document_annotations {
            self.items.retain(|item| !item.is_original);
        }
    }

    fn add(&mut self, annotation: Annotation) {
        self.items.push(annotation);
    }

    fn update(&mut self, id: &AnnotationId, patch: &AnnotationPatch) -> Option<Annotation> {
        let item = self.items.iter_mut().find(|item| &item.id == id)?;
        item.apply(patch);
        Some(item.clone())
    }

    fn delete(&mut self, id: &AnnotationId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.id != id);
        self.items.len() != before
    }

    fn snapshot(&self) -> Vec<Annotation> {
        self.items.clone()
    }
}

struct OnePageLayout;

impl PageLayout for OnePageLayout {
    fn page_viewport(&self, page_number: u32) -> Option<ScreenRect> {
        (page_number == 1).then(|| ScreenRect::new(0.0, 0.0, 600.0, 800.0))
    }

    fn viewport(&self) -> ScreenRect {
        ScreenRect::new(0.0, 0.0, 800.0, 900.0)
    }
}

fn harness(options: CoordinatorOptions) -> (Coordinator, SharedLog, Arc<Mutex<FakePainter>>) {
    let log: SharedLog = Arc::new(Mutex::new(SurfaceLog::default()));
    let painter = Arc::new(Mutex::new(FakePainter::default()));
    let shared: SharedPainter = painter.clone();
    let surfaces = Surfaces {
        menu: Box::new(FakeMenu(Arc::clone(&log))),
        popbar: Box::new(FakePopbar(Arc::clone(&log))),
        sidebar: Box::new(FakeSidebar(Arc::clone(&log))),
        connector: Box::new(FakeConnector(Arc::clone(&log))),
        toolbar: Box::new(FakeToolbar(Arc::clone(&log))),
        notifier: Box::new(FakeNotifier(Arc::clone(&log))),
    };
    let coordinator = Coordinator::new(shared, Box::new(OnePageLayout), surfaces, options);
    (coordinator, log, painter)
}

fn annotation(id: &str, kind: AnnotationKind) -> Annotation {
    let mut annotation = Annotation::new(1, kind, "ada");
    annotation.id = id.into();
    annotation
}

fn rect() -> Rect {
    Rect::new(50.0, 100.0, 80.0, 40.0)
}

#[test]
fn sidebar_set_matches_created_minus_deleted_without_duplicates() {
    let (mut coordinator, log, _) = harness(CoordinatorOptions::default());

    let a = annotation("a", AnnotationKind::Rectangle);
    let b = annotation("b", AnnotationKind::Highlight);
    let c = annotation("c", AnnotationKind::Note);

    coordinator.on_annotation_created(&a, false, None);
    coordinator.on_annotation_created(&b, false, None);
    // Duplicate event for an id already present must be a no-op.
    coordinator.on_annotation_created(&a, false, None);
    coordinator.on_annotation_deleted(&a.id);
    coordinator.on_annotation_created(&c, true, None);
    coordinator.on_annotation_deleted(&"missing".into());

    let log = log.lock().unwrap();
    assert_eq!(log.sidebar, vec![b.id.clone(), c.id.clone()]);
}

#[test]
fn creation_from_single_use_tool_transitions_to_selection() {
    let (mut coordinator, _, painter) = harness(CoordinatorOptions::default());
    let tools = default_tools();
    let stamp = find_tool(&tools, "stamp").expect("stamp tool");

    let placed = annotation("s1", AnnotationKind::Stamp);
    coordinator.on_annotation_created(&placed, false, Some(stamp));

    assert_eq!(painter.lock().unwrap().selected, vec![placed.id]);
}

#[test]
fn creation_during_initial_load_only_populates_the_sidebar() {
    let (mut coordinator, log, painter) =
        harness(CoordinatorOptions { sidebar_open: true, ..CoordinatorOptions::default() });
    let tools = default_tools();
    let signature = find_tool(&tools, "signature").expect("signature tool");

    let loaded = annotation("l1", AnnotationKind::Signature);
    coordinator.on_annotation_created(&loaded, true, Some(signature));

    let log = log.lock().unwrap();
    assert_eq!(log.sidebar, vec![loaded.id]);
    assert!(log.sidebar_selected.is_empty());
    assert!(painter.lock().unwrap().selected.is_empty());
}

#[test]
fn creation_with_open_sidebar_selects_the_new_entry() {
    let (mut coordinator, log, _) =
        harness(CoordinatorOptions { sidebar_open: true, ..CoordinatorOptions::default() });

    let a = annotation("a", AnnotationKind::Freehand);
    coordinator.on_annotation_created(&a, false, None);

    let log = log.lock().unwrap();
    assert_eq!(log.sidebar_selected, vec![a.id]);
}

#[test]
fn selection_opens_menu_and_connector_at_the_supplied_rect() {
    let (mut coordinator, log, _) =
        harness(CoordinatorOptions { sidebar_open: true, ..CoordinatorOptions::default() });

    let a = annotation("a", AnnotationKind::Rectangle);
    coordinator.on_annotation_created(&a, false, None);
    coordinator.on_annotation_selected(&a, true, rect());

    let log = log.lock().unwrap();
    assert_eq!(log.menu_open_for, Some(a.id.clone()));
    assert_eq!(log.connector_for, Some(a.id.clone()));
    assert!(log.sidebar_selected.contains(&a.id));
}

#[test]
fn connector_is_skipped_when_the_feature_is_disabled() {
    let (mut coordinator, log, _) =
        harness(CoordinatorOptions { connector_enabled: false, ..CoordinatorOptions::default() });

    let a = annotation("a", AnnotationKind::Rectangle);
    coordinator.on_annotation_selected(&a, false, rect());

    let log = log.lock().unwrap();
    assert_eq!(log.menu_open_for, Some(a.id));
    assert_eq!(log.connector_for, None);
}

#[test]
fn selection_on_an_unrendered_page_is_a_no_op() {
    let (mut coordinator, log, _) = harness(CoordinatorOptions::default());

    let mut far = annotation("far", AnnotationKind::Circle);
    far.page_number = 7;
    coordinator.on_annotation_selected(&far, true, rect());

    let log = log.lock().unwrap();
    assert_eq!(log.menu_open_for, None);
    assert_eq!(log.connector_for, None);
}

#[test]
fn changing_then_committing_a_different_id_leaves_no_dangling_menu() {
    let (mut coordinator, log, _) = harness(CoordinatorOptions::default());

    let first = annotation("first", AnnotationKind::Rectangle);
    let second = annotation("second", AnnotationKind::Circle);

    coordinator.on_annotation_selected(&first, true, rect());
    coordinator.on_selection_changing(&first.id);
    {
        let log = log.lock().unwrap();
        assert_eq!(log.menu_open_for, None, "menu closes eagerly on drag start");
        assert_eq!(log.connector_for, None);
    }

    coordinator.on_selection_change_committed(&second, rect());
    let log = log.lock().unwrap();
    assert_eq!(log.menu_open_for, Some(second.id.clone()));
    assert_eq!(log.connector_for, Some(second.id));
}

#[test]
fn repeated_changing_events_without_a_commit_are_tolerated() {
    let (mut coordinator, log, painter) = harness(CoordinatorOptions::default());

    let a = annotation("a", AnnotationKind::Freehand);
    coordinator.on_annotation_created(&a, false, None);
    let before = painter.lock().unwrap().snapshot();

    coordinator.on_selection_changing(&a.id);
    coordinator.on_selection_changing(&a.id);
    coordinator.on_selection_changing(&a.id);

    assert_eq!(log.lock().unwrap().menu_open_for, None);
    // The interaction was abandoned; the collection must be untouched.
    assert_eq!(painter.lock().unwrap().snapshot(), before);
}

#[test]
fn deleting_the_menus_annotation_closes_menu_and_connector() {
    let (mut coordinator, log, _) = harness(CoordinatorOptions::default());

    let a = annotation("a", AnnotationKind::Rectangle);
    coordinator.on_annotation_created(&a, false, None);
    coordinator.on_annotation_selected(&a, true, rect());
    coordinator.on_annotation_deleted(&a.id);

    let log = log.lock().unwrap();
    assert_eq!(log.menu_open_for, None);
    assert_eq!(log.connector_for, None);
    assert!(log.sidebar.is_empty());
}

#[test]
fn view_area_update_clears_floating_chrome() {
    let (mut coordinator, log, _) = harness(CoordinatorOptions::default());

    let a = annotation("a", AnnotationKind::Rectangle);
    coordinator.on_annotation_selected(&a, false, rect());
    coordinator.on_viewer_event(ViewerEvent::ViewAreaUpdated);

    let log = log.lock().unwrap();
    assert_eq!(log.menu_open_for, None);
    assert_eq!(log.connector_for, None);
}

#[test]
fn activate_tool_forwards_to_painter_and_toolbar() {
    let (mut coordinator, log, painter) = harness(CoordinatorOptions::default());
    let tools = default_tools();
    let rectangle = find_tool(&tools, "rectangle").expect("rectangle tool");
    let signature = find_tool(&tools, "signature").expect("signature tool");

    coordinator.activate_tool(Some(rectangle), Some("stale payload".into()));
    assert_eq!(painter.lock().unwrap().active_tool.as_deref(), Some("rectangle"));
    // Transfer payloads only survive for single-use tools.
    assert_eq!(painter.lock().unwrap().payloads.last(), Some(&None));

    coordinator.activate_tool(Some(signature), Some("image-bytes".into()));
    assert_eq!(painter.lock().unwrap().payloads.last(), Some(&Some("image-bytes".into())));

    coordinator.reset_tool();
    assert_eq!(painter.lock().unwrap().active_tool, None);
    assert_eq!(coordinator.active_tool(), None);

    let log = log.lock().unwrap();
    assert_eq!(
        log.toolbar_active,
        vec![Some("rectangle".to_owned()), Some("signature".to_owned()), None]
    );
}

#[test]
fn style_edit_updates_record_sidebar_and_toolbar_defaults() {
    let (mut coordinator, log, painter) = harness(CoordinatorOptions::default());

    let a = annotation("a", AnnotationKind::Rectangle);
    coordinator.on_annotation_created(&a, false, None);
    painter.lock().unwrap().add(a.clone());

    coordinator.update_annotation_style(&a, &StylePatch::color("#00B2F4"));

    assert_eq!(
        painter.lock().unwrap().snapshot()[0].style.color.as_deref(),
        Some("#00B2F4")
    );
    let log = log.lock().unwrap();
    assert_eq!(log.sidebar_updated, vec![a.id]);
    assert_eq!(log.toolbar_styles.len(), 1);
    assert_eq!(log.toolbar_styles[0].0, AnnotationKind::Rectangle);
}

#[test]
fn thread_update_propagates_in_place() {
    let (mut coordinator, log, painter) = harness(CoordinatorOptions::default());

    let a = annotation("a", AnnotationKind::Note);
    painter.lock().unwrap().add(a.clone());
    coordinator.on_annotation_created(&a, false, None);

    let patch = AnnotationPatch::thread(
        "Review",
        overmark_model::Contents { text: "please check".into() },
        Vec::new(),
    );
    assert!(coordinator.update_annotation(&a.id, &patch));
    assert!(!coordinator.update_annotation(&"missing".into(), &patch));

    let log = log.lock().unwrap();
    assert_eq!(log.sidebar_updated, vec![a.id.clone()]);
    assert_eq!(painter.lock().unwrap().snapshot()[0].title, "Review");
}

#[test]
fn open_comment_opens_sidebar_and_closes_the_menu() {
    let (mut coordinator, log, _) = harness(CoordinatorOptions::default());

    let a = annotation("a", AnnotationKind::Highlight);
    coordinator.on_annotation_created(&a, false, None);
    coordinator.on_annotation_selected(&a, true, rect());
    coordinator.open_comment_for(&a);

    let log = log.lock().unwrap();
    assert!(log.sidebar_open);
    assert_eq!(log.toolbar_sidebar_toggled.last(), Some(&true));
    assert_eq!(log.sidebar_selected, vec![a.id]);
    assert_eq!(log.menu_open_for, None);
}

#[test]
fn sidebar_toggle_and_scroll_clear_the_connector() {
    let (mut coordinator, log, _) = harness(CoordinatorOptions::default());

    let a = annotation("a", AnnotationKind::Rectangle);
    coordinator.on_annotation_selected(&a, false, rect());
    assert!(log.lock().unwrap().connector_for.is_some());

    coordinator.set_sidebar_open(true);
    assert_eq!(log.lock().unwrap().connector_for, None);

    coordinator.on_annotation_selected(&a, false, rect());
    coordinator.on_sidebar_scrolled();
    assert_eq!(log.lock().unwrap().connector_for, None);
}

#[test]
fn text_selection_opens_popbar_and_highlight_closes_it() {
    let (mut coordinator, log, painter) = harness(CoordinatorOptions::default());

    let selection = TextSelection {
        page_number: 1,
        rect: Rect::new(10.0, 10.0, 120.0, 14.0),
        text: "selected words".into(),
    };
    coordinator.on_text_selected(&selection);
    assert!(log.lock().unwrap().popbar_open);

    coordinator.highlight_selection(&selection);
    assert!(!log.lock().unwrap().popbar_open);
    let items = painter.lock().unwrap().snapshot();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, AnnotationKind::Highlight);
}

#[test]
fn save_without_destination_rejects_with_a_toast_naming_the_key() {
    let (mut coordinator, log, _) = harness(CoordinatorOptions::default());

    coordinator.save_data();

    let log = log.lock().unwrap();
    assert_eq!(log.toasts.len(), 1);
    assert_eq!(log.toasts[0].0, Severity::Error);
    assert!(log.toasts[0].1.contains("postUrl"));
    assert!(log.modals.is_empty(), "not-configured is not a modal failure");
}

#[test]
fn save_transport_failure_raises_the_persistent_modal() {
    let (mut coordinator, log, painter) = harness(CoordinatorOptions {
        post_url: Some("http://127.0.0.1:9/annotations".into()),
        ..CoordinatorOptions::default()
    });

    painter.lock().unwrap().add(annotation("a", AnnotationKind::Rectangle));
    coordinator.save_data();

    let log = log.lock().unwrap();
    assert_eq!(log.modals.len(), 1);
    // The in-memory collection is preserved for a manual retry.
    assert_eq!(painter.lock().unwrap().snapshot().len(), 1);
    assert!(coordinator.has_unsaved_changes());
}

#[test]
fn document_loaded_without_remote_url_starts_clean() {
    let (mut coordinator, log, painter) = harness(CoordinatorOptions::default());

    coordinator.on_annotation_created(&annotation("stale", AnnotationKind::Note), false, None);
    coordinator.on_viewer_event(ViewerEvent::DocumentLoaded);

    assert_eq!(painter.lock().unwrap().init_calls, 1);
    assert!(log.lock().unwrap().sidebar.is_empty(), "reload replaces the sidebar list");
    assert!(!coordinator.has_unsaved_changes());

    // A new annotation makes the collection dirty again.
    painter.lock().unwrap().add(annotation("fresh", AnnotationKind::Rectangle));
    assert!(coordinator.has_unsaved_changes());
}

#[test]
fn page_rendered_prepares_the_painter_canvas() {
    let (mut coordinator, _, painter) = harness(CoordinatorOptions::default());

    assert!(!coordinator.document_ready());
    coordinator.on_viewer_event(ViewerEvent::PageRendered { page_number: 1 });
    coordinator.on_viewer_event(ViewerEvent::PageRendered { page_number: 2 });

    assert!(coordinator.document_ready());
    assert_eq!(painter.lock().unwrap().prepared_pages, vec![1, 2]);
}

#[test]
fn sidebar_click_highlights_the_shape() {
    let (mut coordinator, _, painter) = harness(CoordinatorOptions::default());

    let a = annotation("a", AnnotationKind::Circle);
    coordinator.select_from_sidebar(&a);

    assert_eq!(painter.lock().unwrap().highlighted, vec![a.id]);
}
