use core_paste::sanitize;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Fragments resembling what word processors and browsers put on the
/// clipboard, including malformed and unbalanced pieces.
fn clipboard_piece() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z ]{0,8}",
        Just("&nbsp;".to_string()),
        Just("&amp;".to_string()),
        Just("<p class=\"MsoNormal\">".to_string()),
        Just("<p style=\"mso-line-height:1;text-indent:2em\">".to_string()),
        Just("<p>".to_string()),
        Just("</p>".to_string()),
        Just("<span lang=\"EN-GB\">".to_string()),
        Just("<span style=\"font-family:Calibri;color:red\">".to_string()),
        Just("<span>".to_string()),
        Just("</span>".to_string()),
        Just("<font face=\"Arial\" width=\"3\">".to_string()),
        Just("</font>".to_string()),
        Just("<o:p>".to_string()),
        Just("</o:p>".to_string()),
        Just("<b>".to_string()),
        Just("</b>".to_string()),
        Just("<br>".to_string()),
        Just("<img src=\"data:image/png;base64,AA\" height=\"2\">".to_string()),
        Just("<style>p{color:red}</style>".to_string()),
        Just("<meta charset=\"utf-8\">".to_string()),
        Just("<title>doc".to_string()),
        Just("<!--StartFragment-->".to_string()),
        Just("<!--EndFragment-->".to_string()),
        Just("<!-- comment -->".to_string()),
        Just("<body lang=\"EN\">".to_string()),
        Just("</body>".to_string()),
        Just("<html xmlns:o=\"urn:x\">".to_string()),
        Just("</html>".to_string()),
        Just("<".to_string()),
    ]
}

proptest! {
    #[test]
    fn sanitize_is_idempotent(pieces in prop::collection::vec(clipboard_piece(), 0..30)) {
        let raw: String = pieces.concat();
        let once = sanitize(&raw);
        let twice = sanitize(&once);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn output_never_carries_office_markers(pieces in prop::collection::vec(clipboard_piece(), 0..30)) {
        let out = sanitize(&pieces.concat());
        for marker in ["mso-", "MsoNormal", "<o:p", "font-family", "lang=", "xmlns", "<style", "<meta"] {
            prop_assert!(!out.contains(marker), "{marker} survived in {out}");
        }
        prop_assert_eq!(out.trim(), out.as_str());
    }
}

#[test]
fn browser_copy_with_platform_header() {
    let raw = "Version:0.9\r\nStartHTML:0000000105\r\nEndHTML:0000000290\r\n\
        <html><body>\r\n<!--StartFragment--><h2>Chapter&nbsp;One</h2>\
        <p>It was <em>late</em>.</p><!--EndFragment-->\r\n</body></html>";
    assert_eq!(
        sanitize(raw),
        "<h2>Chapter One</h2><p>It was <em>late</em>.</p>"
    );
}
