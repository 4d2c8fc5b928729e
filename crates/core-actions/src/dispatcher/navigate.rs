//! Page navigation: rail jumps, scroll and caret tracking, resize.

use super::DispatchResult;
use core_events::Tick;
use core_layout::Measurer;
use core_model::EditorModel;

pub(crate) fn handle_jump(page: usize, model: &mut EditorModel, now: Tick) -> DispatchResult {
    let target = model.jump_to_page(page, now);
    DispatchResult::scroll_to(target)
}

pub(crate) fn handle_scroll(scroll_top: f32, model: &mut EditorModel) -> DispatchResult {
    page_changed(model.on_scroll(scroll_top))
}

pub(crate) fn handle_selection(
    caret: Option<usize>,
    model: &mut EditorModel,
    measurer: &dyn Measurer,
) -> DispatchResult {
    page_changed(model.on_selection_change(caret, measurer))
}

pub(crate) fn handle_resize(model: &mut EditorModel, now: Tick) -> DispatchResult {
    model.resize(now);
    DispatchResult {
        relayout: true,
        ..DispatchResult::clean()
    }
}

fn page_changed(page: Option<usize>) -> DispatchResult {
    match page {
        Some(page) => {
            tracing::trace!(target: "actions.dispatch", page, "active_page");
            DispatchResult::dirty()
        }
        None => DispatchResult::clean(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::EditorSettings;
    use core_layout::{StackedMeasurer, StackedMetrics};
    use pretty_assertions::assert_eq;

    fn paged() -> (EditorModel, StackedMeasurer) {
        let settings = EditorSettings {
            page_height: 100.0,
            ..EditorSettings::default()
        };
        let markup: String = (0..12).map(|i| format!("<p>row {i}</p>")).collect();
        let mut m = EditorModel::from_markup(&markup, settings);
        let mut measurer = StackedMeasurer::new(StackedMetrics::default(), 100.0);
        measurer.layout(m.document());
        m.relayout(&measurer);
        (m, measurer)
    }

    #[test]
    fn jump_returns_scroll_target() {
        let (mut m, _) = paged();
        // 12 * 24 + 11 * 16 = 464px, five pages.
        assert_eq!(m.page_count(), 5);
        let r = handle_jump(2, &mut m, Tick::ZERO);
        assert_eq!(r.scroll_to, Some(200.0));
        assert_eq!(m.active_page(), 2);
    }

    #[test]
    fn scroll_reports_only_page_changes() {
        let (mut m, _) = paged();
        assert_eq!(handle_scroll(50.0, &mut m), DispatchResult::clean());
        assert_eq!(handle_scroll(250.0, &mut m), DispatchResult::dirty());
        assert_eq!(m.active_page(), 2);
    }

    #[test]
    fn caret_tracking_follows_measurer() {
        let (mut m, measurer) = paged();
        let offset = m.text().find("row 11").unwrap();
        let r = handle_selection(Some(offset), &mut m, &measurer);
        assert!(r.dirty);
        // row 11 sits at 11 * 40 = 440px.
        assert_eq!(m.active_page(), 4);
    }

    #[test]
    fn resize_requests_relayout_without_changing_content() {
        let (mut m, _) = paged();
        let r = handle_resize(&mut m, Tick::ZERO);
        assert!(r.relayout && !r.document_changed);
        assert_eq!(m.next_deadline(), Some(Tick::from_millis(150)));
    }
}
