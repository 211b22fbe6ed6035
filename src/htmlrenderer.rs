//! Implements a custom [`push_html`] to render footnotes with back-links.
//! [`pulldown_cmark::html::push_html`] renders each footnote definition in
//! place, wherever it appears in the source, and without any way back to the
//! reference. Here references become numbered superscripts, and definitions
//! are pulled out of the flow and emitted as one trailing footnotes section
//! whose items link back to the text.

use pulldown_cmark::{html, CowStr, Event, Tag, TagEnd};
use std::collections::HashMap;
use std::fmt::Write;

/// A footnote definition pulled out of the main flow.
struct Definition {
    label: String,
    html: String,
}

/// Routes [`Event`]s either to the main document or into the footnote
/// definition currently being captured.
#[derive(Default)]
struct HtmlRenderer<'a> {
    /// Events of the main document, with footnote references already turned
    /// into inline HTML.
    body: Vec<Event<'a>>,

    /// The label and events of the definition being captured, if any.
    capturing: Option<(String, Vec<Event<'a>>)>,

    /// Footnote numbers keyed by label, in first-reference order.
    numbers: HashMap<String, usize>,

    /// How often each footnote has been referenced so far.
    reference_counts: HashMap<usize, usize>,

    definitions: Vec<Definition>,
}

impl<'a> HtmlRenderer<'a> {
    fn on_event(&mut self, event: Event<'a>) {
        match event {
            Event::Start(Tag::FootnoteDefinition(label)) => {
                self.capturing = Some((label.to_string(), Vec::new()));
            }
            Event::End(TagEnd::FootnoteDefinition) => {
                if let Some((label, events)) = self.capturing.take() {
                    let mut out = String::new();
                    html::push_html(&mut out, events.into_iter());
                    self.definitions.push(Definition { label, html: out });
                }
            }
            Event::FootnoteReference(label) => {
                let reference = self.on_reference(&label);
                self.push(Event::InlineHtml(CowStr::from(reference)));
            }
            _ => self.push(event),
        }
    }

    fn push(&mut self, event: Event<'a>) {
        match &mut self.capturing {
            Some((_, events)) => events.push(event),
            None => self.body.push(event),
        }
    }

    fn number(&mut self, label: &str) -> usize {
        let next = self.numbers.len() + 1;
        *self.numbers.entry(label.to_owned()).or_insert(next)
    }

    fn on_reference(&mut self, label: &str) -> String {
        let n = self.number(label);
        let count = self.reference_counts.entry(n).or_insert(0);
        let id = match *count {
            0 => format!("fnref{}", n),
            k => format!("fnref{}:{}", n, k),
        };
        *count += 1;
        format!(
            r##"<sup class="footnote-ref"><a href="#fn{n}" id="{id}">[{n}]</a></sup>"##,
            n = n,
            id = id,
        )
    }

    fn finish(mut self, out: &mut String) {
        html::push_html(out, self.body.drain(..));
        if self.definitions.is_empty() {
            return;
        }

        // Referenced definitions come first, in reference order. Definitions
        // that are never referenced get the following numbers and no
        // back-link.
        let mut items: Vec<(usize, bool, String)> = Vec::with_capacity(self.definitions.len());
        let definitions = std::mem::take(&mut self.definitions);
        for definition in definitions {
            let referenced = self.numbers.contains_key(&definition.label);
            let n = self.number(&definition.label);
            items.push((n, referenced, definition.html));
        }
        items.sort_by_key(|(n, _, _)| *n);
        items.dedup_by_key(|(n, _, _)| *n);

        out.push_str("<hr class=\"footnotes-sep\" />\n");
        out.push_str("<section class=\"footnotes\">\n<ol class=\"footnotes-list\">\n");
        for (n, referenced, html) in items {
            let _ = write!(out, "<li id=\"fn{}\" class=\"footnote-item\">", n);
            if !referenced {
                out.push_str(&html);
            } else {
                let backref = format!(
                    r##" <a href="#fnref{}" class="footnote-backref">↩</a>"##,
                    n
                );
                match html.strip_suffix("</p>\n") {
                    Some(inner) => {
                        out.push_str(inner);
                        out.push_str(&backref);
                        out.push_str("</p>\n");
                    }
                    None => {
                        out.push_str(&html);
                        out.push_str(&backref);
                    }
                }
            }
            out.push_str("</li>\n");
        }
        out.push_str("</ol>\n</section>\n");
    }
}

/// Converts [`Event`]s into an HTML string much like
/// `pulldown_cmark::html::push_html` except that footnotes are collected
/// into a trailing section with back-links. See the module description for
/// more details.
pub fn push_html<'a, I>(out: &mut String, events: I)
where
    I: Iterator<Item = Event<'a>>,
{
    let mut renderer = HtmlRenderer::default();
    for event in events {
        renderer.on_event(event);
    }
    renderer.finish(out);
}

#[cfg(test)]
mod test {
    use super::*;
    use pulldown_cmark::{Options, Parser};

    fn render(markdown: &str) -> String {
        let mut out = String::new();
        push_html(&mut out, Parser::new_ext(markdown, Options::ENABLE_FOOTNOTES));
        out
    }

    #[test]
    fn test_no_footnotes() {
        assert_eq!("<p>plain</p>\n", render("plain"));
    }

    #[test]
    fn test_reference_and_definition() {
        let html = render("Claim[^a].\n\n[^a]: Source.\n");
        assert!(html.contains(
            r##"<sup class="footnote-ref"><a href="#fn1" id="fnref1">[1]</a></sup>"##
        ));
        assert!(html.contains(r#"<section class="footnotes">"#));
        assert!(html.contains(
            r##"<li id="fn1" class="footnote-item"><p>Source. <a href="#fnref1" class="footnote-backref">↩</a></p>"##
        ));

        // The definition only shows up inside the footnotes section.
        let section = html.find("<section").unwrap();
        assert!(!html[..section].contains("Source."));
    }

    #[test]
    fn test_numbering_follows_references() {
        let html = render("One[^z] two[^a] again[^z].\n\n[^a]: A.\n\n[^z]: Z.\n");
        assert!(html.contains(r##"<a href="#fn1" id="fnref1">[1]</a>"##));
        assert!(html.contains(r##"<a href="#fn2" id="fnref2">[2]</a>"##));
        assert!(html.contains(r##"<a href="#fn1" id="fnref1:1">[1]</a>"##));
        let z = html.find(r#"<li id="fn1""#).unwrap();
        let a = html.find(r#"<li id="fn2""#).unwrap();
        assert!(z < a);
        assert!(html[z..a].contains("Z."));
    }

    #[test]
    fn test_unreferenced_definition() {
        let html = render("Text.\n\n[^lonely]: Nobody points here.\n");
        assert!(html.contains(r#"<li id="fn1" class="footnote-item"><p>Nobody points here.</p>"#));
        assert!(!html.contains("footnote-backref"));
    }
}
