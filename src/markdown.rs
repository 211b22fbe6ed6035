//! Markdown to HTML conversion for post bodies.
//!
//! On top of CommonMark this turns on footnotes, smart punctuation, tables,
//! strikethrough and task lists, lets raw HTML through untouched, and turns
//! bare URLs into links. Fenced code blocks are routed by their language tag:
//! the configured custom language goes to an external [`Highlight`], grammars
//! known to `syntect` are highlighted in-process, and everything else is
//! emitted as plain preformatted text.

use crate::highlight::{Highlight, NoHighlighter, SyntaxHighlighter};
use crate::htmlrenderer;
use log::debug;
use maud::{html, PreEscaped};
use pulldown_cmark::{
    CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream,
};
use regex::Regex;
use std::sync::OnceLock;

/// Converts Markdown to HTML. Building one is relatively expensive (it loads
/// the bundled grammars), so build it once per site build.
pub struct Renderer {
    syntax: SyntaxHighlighter,

    /// The language tag handled by `external`, e.g. `typ`.
    external_language: Option<String>,
    external: Box<dyn Highlight>,
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer::new()
    }
}

impl Renderer {
    /// A renderer without an external highlighter.
    pub fn new() -> Renderer {
        Renderer {
            syntax: SyntaxHighlighter::new(),
            external_language: None,
            external: Box::new(NoHighlighter),
        }
    }

    /// Delegates code blocks tagged `language` to `highlighter`.
    pub fn with_external<H>(mut self, language: &str, highlighter: H) -> Renderer
    where
        H: Highlight + 'static,
    {
        self.external_language = Some(language.to_owned());
        self.external = Box::new(highlighter);
        self
    }

    /// Renders `markdown` into an HTML fragment. Never fails: every
    /// highlighting problem degrades to plain text.
    pub fn to_html(&self, markdown: &str) -> String {
        let mut converter = EventConverter {
            renderer: self,
            code: None,
            link_depth: 0,
        };
        let events = TextMergeStream::new(Parser::new_ext(markdown, options()))
            .flat_map(move |ev| converter.convert(ev));

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        htmlrenderer::push_html(&mut out, events);
        out
    }

    fn code_block<'a>(&self, kind: CodeBlockKind<'a>, code: String) -> Vec<Event<'a>> {
        let language = match &kind {
            CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_owned),
            CodeBlockKind::Indented => None,
        };

        if let Some(language) = &language {
            if self.external_language.as_deref() == Some(language.as_str()) {
                if let Some(markup) = self.external.highlight(&code) {
                    return vec![Event::Html(CowStr::from(format!("<pre>{}</pre>\n", markup)))];
                }
            } else if !self.syntax.supports(language) {
                debug!("no grammar for `{}`, rendering plain", language);
            } else if let Some(markup) = self.syntax.highlight(&code, language) {
                let block = html! {
                    pre {
                        code class=(format!("language-{}", language)) { (PreEscaped(markup)) }
                    }
                };
                return vec![Event::Html(CowStr::from(block.into_string() + "\n"))];
            }
        }

        // Plain: let pulldown-cmark escape the text as usual.
        vec![
            Event::Start(Tag::CodeBlock(kind)),
            Event::Text(CowStr::from(code)),
            Event::End(TagEnd::CodeBlock),
        ]
    }
}

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

struct EventConverter<'r, 'a> {
    renderer: &'r Renderer,

    /// The code block being collected, if any.
    code: Option<(CodeBlockKind<'a>, String)>,

    /// Nesting depth of links and images. Text inside them is never
    /// linkified.
    link_depth: usize,
}

impl<'r, 'a> EventConverter<'r, 'a> {
    fn convert(&mut self, ev: Event<'a>) -> Vec<Event<'a>> {
        match ev {
            Event::Start(Tag::CodeBlock(kind)) => {
                self.code = Some((kind, String::new()));
                Vec::new()
            }
            Event::Text(text) if self.code.is_some() => {
                if let Some((_, code)) = &mut self.code {
                    code.push_str(&text);
                }
                Vec::new()
            }
            Event::End(TagEnd::CodeBlock) => match self.code.take() {
                Some((kind, code)) => self.renderer.code_block(kind, code),
                None => vec![ev],
            },
            Event::Start(Tag::Link { .. } | Tag::Image { .. }) => {
                self.link_depth += 1;
                vec![ev]
            }
            Event::End(TagEnd::Link | TagEnd::Image) => {
                self.link_depth = self.link_depth.saturating_sub(1);
                vec![ev]
            }
            Event::InlineHtml(ref raw) => {
                let lower = raw.to_ascii_lowercase();
                if lower.starts_with("</a") {
                    self.link_depth = self.link_depth.saturating_sub(1);
                } else if lower.starts_with("<a ") || lower.starts_with("<a>") {
                    self.link_depth += 1;
                }
                vec![ev]
            }
            Event::Text(text) if self.link_depth == 0 => linkify(text),
            _ => vec![ev],
        }
    }
}

fn url_regex() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| {
        // Trailing punctuation is more likely to end the sentence than the URL.
        Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"]*[^\s<>"'.,:;!?)\]]"#)
            .unwrap_or_else(|err| panic!("invalid URL pattern: {}", err))
    })
}

/// Splits a text event around bare URLs, wrapping each URL in a link.
fn linkify(text: CowStr<'_>) -> Vec<Event<'_>> {
    let mut events = Vec::new();
    let mut last = 0;
    for m in url_regex().find_iter(&text) {
        if m.start() > last {
            events.push(Event::Text(CowStr::from(text[last..m.start()].to_owned())));
        }
        let href = if m.as_str().to_ascii_lowercase().starts_with("www.") {
            format!("http://{}", m.as_str())
        } else {
            m.as_str().to_owned()
        };
        events.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(href),
            title: CowStr::from(""),
            id: CowStr::from(""),
        }));
        events.push(Event::Text(CowStr::from(m.as_str().to_owned())));
        events.push(Event::End(TagEnd::Link));
        last = m.end();
    }

    if events.is_empty() {
        return vec![Event::Text(text)];
    }
    if last < text.len() {
        events.push(Event::Text(CowStr::from(text[last..].to_owned())));
    }
    events
}
