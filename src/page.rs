//! Renders the index page and the post pages.
//!
//! Every page is the same skeleton ([`base`]) wrapped around page-specific
//! content. Each structural fragment is its own small function returning
//! [`Markup`], and the page functions just compose them.

use crate::config::{Site, ATOM_PATH, RSS_PATH};
use crate::post::{Post, Posts};
use maud::{html, Markup, PreEscaped, DOCTYPE};

/// The site-relative URL of the index page.
pub const ROOT_URL: &str = "/";

/// What the skeleton needs to know about the page it wraps.
struct PageMeta<'a> {
    /// The Open Graph type: `website` or `article`.
    og_type: &'static str,
    title: &'a str,
    description: &'a str,

    /// The site-relative URL of the page.
    url: &'a str,
}

impl PageMeta<'_> {
    fn is_root(&self) -> bool {
        self.url == ROOT_URL
    }
}

/// Renders the index page: every listed post, newest first.
pub fn render_index(site: &Site, posts: &Posts) -> String {
    let meta = PageMeta {
        og_type: "website",
        title: &site.title,
        description: &site.description,
        url: ROOT_URL,
    };
    let content = html! {
        ul class="posts" {
            @for post in posts.listed() {
                li {
                    h2 { a href=(post.url) { (post.title) } }
                    (time(post))
                }
            }
        }
    };
    base(site, &meta, content).into_string()
}

/// Renders the page of a single post. Hidden posts render like any other.
pub fn render_post(site: &Site, post: &Post) -> String {
    let title = format!("{} | {}", post.title, site.title);
    let meta = PageMeta {
        og_type: "article",
        title: &title,
        description: &post.description,
        url: &post.url,
    };
    let content = html! {
        article {
            h1 { (post.title) }
            (time(post))
            (PreEscaped(&post.content))
        }
    };
    base(site, &meta, content).into_string()
}

fn base(site: &Site, meta: &PageMeta, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang=(site.language) {
            (head(site, meta))
            body {
                (header(site))
                main { (content) }
                @if meta.is_root() {
                    (footer(site))
                }
            }
        }
    }
}

fn head(site: &Site, meta: &PageMeta) -> Markup {
    html! {
        head {
            meta charset="utf-8";
            title { (meta.title) }
            meta name="viewport" content="width=device-width, initial-scale=1";
            meta name="description" content=(meta.description);
            meta property="og:type" content=(meta.og_type);
            meta property="og:title" content=(meta.title);
            meta property="og:url" content=(site.absolute(meta.url));
            meta property="og:site_name" content=(site.title);
            meta property="og:description" content=(meta.description);
            link rel="stylesheet" href="/styles.css";
            @if meta.is_root() {
                link
                    rel="alternate"
                    type="application/rss+xml"
                    href=(RSS_PATH)
                    title=(format!("RSS Feed for {}", site.title));
                link
                    rel="alternate"
                    type="application/atom+xml"
                    href=(ATOM_PATH)
                    title=(format!("Atom Feed for {}", site.title));
            }
        }
    }
}

fn header(site: &Site) -> Markup {
    html! {
        header {
            a href="/" class="home" { (site.title) }
            @if let Some(social) = &site.social {
                a href=(social.href) class="social" {
                    img src=(social.icon) alt=(social.alt) width="32" height="32";
                }
            }
        }
    }
}

fn footer(site: &Site) -> Markup {
    html! {
        footer {
            nav {
                a href=(RSS_PATH) { "RSS Feed" }
                a href=(ATOM_PATH) { "Atom Feed" }
                @for link in &site.footer_links {
                    a href=(link.href) { (link.title) }
                }
            }
        }
    }
}

fn time(post: &Post) -> Markup {
    html! {
        time datetime=(post.iso_date()) { (post.readable_date()) }
    }
}
