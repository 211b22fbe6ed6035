use blogpress::build::{build_site, Error, Summary};
use blogpress::config::Config;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const PROJECT: &str = "
title: Jane's Blog
description: Blog about my projects.
base_url: https://example.org
author:
  name: Jane Doe
  email: jane@example.org
copyright_year: 2024
verification_token: abc123
social:
  href: https://github.com/jane
  icon: /assets/github.png
  alt: GitHub
footer_links:
  - title: My Thesis
    href: /thesis.pdf
";

/// A scratch project with a stylesheet and empty `posts`, `assets`, and
/// `public` directories.
struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Result<Project> {
        Project::with_settings("")
    }

    /// A project whose `blog.yaml` has `settings` appended.
    fn with_settings(settings: &str) -> Result<Project> {
        let dir = tempfile::tempdir()?;
        for sub in &["posts", "assets", "public"] {
            fs::create_dir(dir.path().join(sub))?;
        }
        fs::write(dir.path().join("styles.css"), "body { margin: 0 }")?;
        fs::write(dir.path().join("blog.yaml"), format!("{}{}", PROJECT, settings))?;
        Ok(Project { dir })
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn out(&self) -> PathBuf {
        self.root().join("dist")
    }

    fn post(&self, name: &str, contents: &str) -> Result<()> {
        fs::write(self.root().join("posts").join(format!("{}.md", name)), contents)?;
        Ok(())
    }

    fn build(&self) -> std::result::Result<Summary, Error> {
        let config = Config::from_directory(self.root()).expect("project file should load");
        build_site(&config)
    }

    fn read(&self, path: &str) -> String {
        fs::read_to_string(self.out().join(path))
            .unwrap_or_else(|e| panic!("reading {}: {}", path, e))
    }
}

fn post(title: &str, date: &str, hidden: bool) -> String {
    format!(
        "---\ntitle: {}\ndate: {}\ndescription: About {}\nhidden: {}\n---\nBody of {}.\n",
        title, date, title, hidden, title
    )
}

/// Reads every file under `dir` keyed by its relative path.
fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            (
                e.path().strip_prefix(dir).unwrap().to_owned(),
                fs::read(e.path()).unwrap(),
            )
        })
        .collect()
}

#[test]
fn test_hello_post_scenario() -> Result<()> {
    let project = Project::new()?;
    project.post(
        "hello",
        "---\ntitle: Hello\ndate: 2024-01-01\ndescription: A test\n---\n# Hi\n\nBody text.",
    )?;
    project.build()?;

    let page = project.read("posts/hello/index.html");
    assert!(page.contains("<h1>Hello</h1>"));
    assert!(page.contains("<h1>Hi</h1>"));
    assert!(page.contains("<p>Body text.</p>"));
    assert!(page.contains("January 1, 2024"));
    assert!(page.contains(r#"<meta name="description" content="A test">"#));
    assert!(page.contains(r#"<meta property="og:url" content="https://example.org/posts/hello">"#));
    Ok(())
}

#[test]
fn test_output_layout() -> Result<()> {
    let project = Project::new()?;
    project.post("one", &post("One", "2024-01-01", false))?;
    fs::create_dir_all(project.root().join("assets/img"))?;
    fs::write(project.root().join("assets/img/logo.png"), [137u8, 80, 78, 71])?;
    fs::write(project.root().join("public/thesis.pdf"), b"%PDF-1.4")?;

    let summary = project.build()?;
    assert_eq!(
        Summary {
            posts: 1,
            listed: 1,
            copied: 2
        },
        summary
    );

    let out = project.out();
    assert_eq!("OK", project.read("health"));
    assert_eq!("ahrefs-site-verification_abc123", project.read("ahrefs_abc123"));
    assert_eq!("body { margin: 0 }", project.read("styles.css"));
    assert_eq!(vec![137u8, 80, 78, 71], fs::read(out.join("assets/img/logo.png"))?);
    assert_eq!(b"%PDF-1.4".to_vec(), fs::read(out.join("thesis.pdf"))?);
    assert!(out.join("index.html").is_file());
    assert!(out.join("posts/one/index.html").is_file());
    assert!(out.join("rss.xml").is_file());
    assert!(out.join("atom.xml").is_file());
    Ok(())
}

#[test]
fn test_hidden_post() -> Result<()> {
    let project = Project::new()?;
    project.post("visible", &post("Visible", "2024-01-01", false))?;
    project.post("secret", &post("Secret", "2024-02-01", true))?;
    let summary = project.build()?;
    assert_eq!(2, summary.posts);
    assert_eq!(1, summary.listed);

    assert!(project.read("posts/secret/index.html").contains("<h1>Secret</h1>"));
    assert!(!project.read("index.html").contains("/posts/secret"));

    let rss = rss::Channel::read_from(project.read("rss.xml").as_bytes())?;
    assert_eq!(1, rss.items().len());
    assert_eq!(Some("/posts/visible"), rss.items()[0].link());

    let atom = atom_syndication::Feed::read_from(project.read("atom.xml").as_bytes())?;
    assert_eq!(1, atom.entries().len());
    assert_eq!("/posts/visible", atom.entries()[0].id());
    Ok(())
}

#[test]
fn test_index_order_and_feeds() -> Result<()> {
    let project = Project::new()?;
    project.post("b", &post("B", "2024-02-01", false))?;
    project.post("c", &post("C", "2024-03-01T09:30:00+02:00", false))?;
    project.post("a", &post("A", "2024-01-01", false))?;
    project.build()?;

    let index = project.read("index.html");
    let positions: Vec<usize> = ["/posts/c", "/posts/b", "/posts/a"]
        .iter()
        .map(|url| index.find(&format!("href=\"{}\"", url)).unwrap())
        .collect();
    assert!(positions[0] < positions[1] && positions[1] < positions[2]);
    assert!(index.contains(r#"href="/rss.xml""#));
    assert!(index.contains("<footer>"));

    let rss = rss::Channel::read_from(project.read("rss.xml").as_bytes())?;
    let links: Vec<&str> = rss.items().iter().filter_map(|i| i.link()).collect();
    assert_eq!(vec!["/posts/a", "/posts/b", "/posts/c"], links);

    let atom = atom_syndication::Feed::read_from(project.read("atom.xml").as_bytes())?;
    let ids: Vec<&str> = atom.entries().iter().map(|e| e.id()).collect();
    assert_eq!(vec!["/posts/a", "/posts/b", "/posts/c"], ids);
    Ok(())
}

#[test]
fn test_index_date_round_trip() -> Result<()> {
    let project = Project::new()?;
    project.post("c", &post("C", "2024-03-01T09:30:00+02:00", false))?;
    project.build()?;

    let index = project.read("index.html");
    let start = index.find("datetime=\"").unwrap() + "datetime=\"".len();
    let end = start + index[start..].find('"').unwrap();
    let parsed = DateTime::parse_from_rfc3339(&index[start..end])?.with_timezone(&Utc);
    assert_eq!(blogpress::post::parse_date("2024-03-01T07:30:00Z")?, parsed);
    assert!(index.contains(">March 1, 2024</time>"));
    Ok(())
}

#[test]
fn test_no_posts() -> Result<()> {
    let project = Project::new()?;
    let summary = project.build()?;
    assert_eq!(0, summary.posts);

    assert!(project.read("index.html").contains(r#"<ul class="posts"></ul>"#));
    let rss = rss::Channel::read_from(project.read("rss.xml").as_bytes())?;
    assert!(rss.items().is_empty());
    let atom = atom_syndication::Feed::read_from(project.read("atom.xml").as_bytes())?;
    assert!(atom.entries().is_empty());
    Ok(())
}

#[test]
fn test_build_is_idempotent() -> Result<()> {
    let project = Project::new()?;
    project.post("a", &post("A", "2024-01-01", false))?;
    project.post("b", &post("B", "2024-01-01", true))?;
    project.post(
        "code",
        "---\ntitle: Code\ndate: 2024-05-01\ndescription: d\n---\n```rust\nfn main() {}\n```\n\nNote[^1].\n\n[^1]: Footnote.\n",
    )?;
    fs::write(project.root().join("assets/x.txt"), "x")?;

    project.build()?;
    let first = snapshot(&project.out());
    project.build()?;
    let second = snapshot(&project.out());
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_unknown_code_language_does_not_fail() -> Result<()> {
    let project = Project::new()?;
    project.post(
        "code",
        "---\ntitle: Code\ndate: 2024-01-01\ndescription: d\n---\n```klingon\nQapla' <3\n```\n",
    )?;
    project.build()?;
    assert!(project
        .read("posts/code/index.html")
        .contains("<pre><code class=\"language-klingon\">Qapla' &lt;3\n</code></pre>"));
    Ok(())
}

const TYPST_POST: &str = "---\ntitle: Typst\ndate: 2024-01-01\ndescription: d\n---\n```typ\n#let x = 1\n```\n";

#[test]
#[cfg(unix)]
fn test_external_highlighter() -> Result<()> {
    let project = Project::with_settings("highlighter:\n  language: typ\n  command: [cat]\n")?;
    project.post("typst", TYPST_POST)?;
    project.build()?;
    let page = project.read("posts/typst/index.html");
    assert!(page.contains("<pre>#let x = 1\n</pre>"));
    assert!(!page.contains("language-typ"));
    Ok(())
}

#[test]
#[cfg(unix)]
fn test_failing_external_highlighter_degrades() -> Result<()> {
    let project = Project::with_settings(
        "highlighter:\n  language: typ\n  command: [sh, -c, \"exit 1\"]\n",
    )?;
    project.post("typst", TYPST_POST)?;
    let summary = project.build()?;
    assert_eq!(1, summary.posts);
    assert!(project
        .read("posts/typst/index.html")
        .contains("<pre><code class=\"language-typ\">#let x = 1\n</code></pre>"));
    Ok(())
}

#[test]
fn test_invalid_post_aborts_build() -> Result<()> {
    let project = Project::new()?;
    project.post("good", &post("Good", "2024-01-01", false))?;
    project.post("bad", "---\ntitle: Bad\ndate: 2024-01-01\n---\nNo description.")?;

    match project.build() {
        Err(Error::Parse(err)) => {
            assert!(err.is_invalid_post());
            assert!(err.to_string().contains("description"));
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
    assert!(!project.out().join("index.html").exists());
    Ok(())
}

#[test]
fn test_missing_assets_aborts_build() -> Result<()> {
    let project = Project::new()?;
    fs::remove_dir(project.root().join("assets"))?;
    assert!(project.build().is_err());
    Ok(())
}

#[test]
fn test_missing_stylesheet_aborts_build() -> Result<()> {
    let project = Project::new()?;
    fs::remove_file(project.root().join("styles.css"))?;
    assert!(matches!(project.build(), Err(Error::Copy { .. })));
    Ok(())
}
