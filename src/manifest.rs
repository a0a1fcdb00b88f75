//! Manifest descriptor (`modDesc.xml`) editing.
//!
//! Nodes are addressed with small path expressions relative to the root element:
//! `version`, `extraSourceFiles.sourceFile`, `storeItems/storeItem[1]`, `@descVersion`,
//! `extraSourceFiles.sourceFile[@filename=src/debug.lua]`.
//! A leading segment equal to the root element's name is ignored, so
//! `modDesc.version` and `version` address the same node.

use crate::constants::{DEFAULT_MOD_VERSION, MOD_DESC_FILE, MOD_DESC_VERSION};
use crate::error::{Error, Result};
use crate::project::Project;
use log::debug;
use std::path::{Path, PathBuf};
use xmltree::{Element, EmitterConfig, XMLNode};

/// Narrows the elements an element segment matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Every element with the segment's name
    All,
    /// The n-th element with the segment's name, 0-based
    Index(usize),
    /// Elements whose attribute has the given value
    Attribute { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Element { name: String, selector: Selector },
    Attribute(String),
}

impl Segment {
    fn matches(&self, element: &Element) -> bool {
        match self {
            Segment::Element { name, selector } => {
                &element.name == name
                    && match selector {
                        Selector::Attribute { name, value } => {
                            element.attributes.get(name) == Some(value)
                        }
                        _ => true,
                    }
            }
            Segment::Attribute(_) => false,
        }
    }

    fn index(&self) -> Option<usize> {
        match self {
            Segment::Element { selector: Selector::Index(i), .. } => Some(*i),
            _ => None,
        }
    }
}

/// A parsed node path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath {
    segments: Vec<Segment>,
}

impl NodePath {
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            Error::ValidationError(format!("invalid manifest path '{}': {}", path, reason))
        };

        let raw = split_segments(path).ok_or_else(|| invalid("unbalanced brackets"))?;
        if raw.is_empty() {
            return Err(invalid("empty path"));
        }

        let mut segments = Vec::with_capacity(raw.len());
        for (i, part) in raw.iter().enumerate() {
            if let Some(attr) = part.strip_prefix('@') {
                if i != raw.len() - 1 || attr.is_empty() {
                    return Err(invalid("an attribute must be the last segment"));
                }
                segments.push(Segment::Attribute(attr.to_string()));
                continue;
            }

            let segment = match part.split_once('[') {
                Some((name, rest)) => {
                    let inner = rest.strip_suffix(']').ok_or_else(|| invalid("bad selector"))?;
                    let selector = parse_selector(inner).ok_or_else(|| invalid("bad selector"))?;
                    Segment::Element { name: name.to_string(), selector }
                }
                None => Segment::Element { name: part.to_string(), selector: Selector::All },
            };
            segments.push(segment);
        }

        Ok(Self { segments })
    }

    /// Whether the path ends in an element picked by position. Removing such a path
    /// again removes the next sibling.
    pub fn ends_with_index(&self) -> bool {
        self.segments.last().and_then(Segment::index).is_some()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn relative_to(&self, root: &str) -> &[Segment] {
        match self.segments.first() {
            Some(Segment::Element { name, selector: Selector::All })
                if name == root && self.segments.len() > 1 =>
            {
                &self.segments[1..]
            }
            _ => &self.segments,
        }
    }
}

/// Splits on `.` and `/` outside of `[...]` selectors.
fn split_segments(path: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in path.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.checked_sub(1)?,
            '.' | '/' if depth == 0 => {
                parts.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&path[start..]);

    Some(parts.into_iter().filter(|s| !s.is_empty()).collect())
}

fn parse_selector(inner: &str) -> Option<Selector> {
    match inner.strip_prefix('@') {
        Some(condition) => {
            let (name, value) = condition.split_once('=')?;
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            if name.is_empty() {
                return None;
            }
            Some(Selector::Attribute { name: name.to_string(), value: value.to_string() })
        }
        None => inner.parse().ok().map(Selector::Index),
    }
}

/// An in-memory manifest document.
///
/// The source's XML declaration is kept as written and emitted again on save.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestTree {
    declaration: Option<String>,
    root: Element,
}

impl ManifestTree {
    pub fn parse(content: &[u8]) -> std::result::Result<Self, xmltree::ParseError> {
        Ok(Self { declaration: declaration_of(content), root: Element::parse(content)? })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read(path)?;
        Self::parse(&content)
            .map_err(|e| Error::ManifestError { path: path.to_path_buf(), e: e.to_string() })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self
            .to_bytes()
            .map_err(|e| Error::ManifestError { path: path.to_path_buf(), e })?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, String> {
        let config = EmitterConfig::new()
            .perform_indent(true)
            .indent_string("    ")
            .write_document_declaration(false);
        let mut body = Vec::new();
        self.root.write_with_config(&mut body, config).map_err(|e| e.to_string())?;

        let mut out = Vec::with_capacity(body.len() + 64);
        if let Some(declaration) = &self.declaration {
            out.extend_from_slice(declaration.as_bytes());
            out.push(b'\n');
        }
        out.extend_from_slice(body.trim_ascii());
        out.push(b'\n');
        Ok(out)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// The `<?xml ...?>` declaration of the source, if it had one.
    pub fn declaration(&self) -> Option<&str> {
        self.declaration.as_deref()
    }

    /// Text of an element, or value of an attribute.
    pub fn get(&self, path: &NodePath) -> Option<String> {
        let segments = path.relative_to(&self.root.name);
        let (last, parents) = segments.split_last()?;

        let mut current = &self.root;
        for segment in parents {
            current = find_child(current, segment)?;
        }

        match last {
            Segment::Attribute(name) => current.attributes.get(name).cloned(),
            element => Some(find_child(current, element)?.get_text()?.into_owned()),
        }
    }

    /// Sets the text of an element or the value of an attribute, creating missing elements
    /// on the way. Existing nodes are updated in place, never duplicated.
    pub fn set_or_create(&mut self, path: &NodePath, value: &str) {
        let segments = path.relative_to(&self.root.name);
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut current = &mut self.root;
        for segment in parents {
            current = child_or_create(current, segment);
        }

        match last {
            Segment::Attribute(name) => {
                current.attributes.insert(name.clone(), value.to_string());
            }
            element => set_text(child_or_create(current, element), value),
        }
    }

    /// Removes the addressed node and returns whether anything was removed.
    ///
    /// Without an index every element matching the last segment is removed. With an index
    /// only that element goes, so removing the same path twice removes two elements.
    pub fn remove(&mut self, path: &NodePath) -> bool {
        let segments = path.relative_to(&self.root.name);
        let Some((last, parents)) = segments.split_last() else {
            return false;
        };

        let mut current = &mut self.root;
        for segment in parents {
            match find_child_mut(current, segment) {
                Some(child) => current = child,
                None => return false,
            }
        }

        if let Segment::Attribute(name) = last {
            return current.attributes.shift_remove(name).is_some();
        }

        let index = last.index();
        let before = current.children.len();
        let mut seen = 0;
        current.children.retain(|node| match node {
            XMLNode::Element(e) if last.matches(e) => {
                let matched = index.map_or(true, |i| i == seen);
                seen += 1;
                !matched
            }
            _ => true,
        });
        current.children.len() != before
    }
}

fn declaration_of(content: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(content).ok()?;
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if !text.starts_with("<?xml") {
        return None;
    }
    let end = text.find("?>")?;
    Some(text[..end + 2].to_string())
}

fn find_child<'a>(parent: &'a Element, segment: &Segment) -> Option<&'a Element> {
    parent
        .children
        .iter()
        .filter_map(|node| match node {
            XMLNode::Element(e) if segment.matches(e) => Some(e),
            _ => None,
        })
        .nth(segment.index().unwrap_or(0))
}

fn find_child_position(parent: &Element, segment: &Segment) -> Option<usize> {
    parent
        .children
        .iter()
        .enumerate()
        .filter(|(_, node)| matches!(node, XMLNode::Element(e) if segment.matches(e)))
        .map(|(position, _)| position)
        .nth(segment.index().unwrap_or(0))
}

fn find_child_mut<'a>(parent: &'a mut Element, segment: &Segment) -> Option<&'a mut Element> {
    let position = find_child_position(parent, segment)?;
    match &mut parent.children[position] {
        XMLNode::Element(e) => Some(e),
        _ => None,
    }
}

fn child_or_create<'a>(parent: &'a mut Element, segment: &Segment) -> &'a mut Element {
    let position = match find_child_position(parent, segment) {
        Some(position) => position,
        None => {
            let mut element = match segment {
                Segment::Element { name, .. } | Segment::Attribute(name) => Element::new(name),
            };
            if let Segment::Element { selector: Selector::Attribute { name, value }, .. } = segment {
                element.attributes.insert(name.clone(), value.clone());
            }
            parent.children.push(XMLNode::Element(element));
            parent.children.len() - 1
        }
    };

    match &mut parent.children[position] {
        XMLNode::Element(e) => e,
        _ => unreachable!("position always points at an element"),
    }
}

fn set_text(element: &mut Element, value: &str) {
    element.children.retain(|node| !matches!(node, XMLNode::Text(_) | XMLNode::CData(_)));
    element.children.insert(0, XMLNode::Text(value.to_string()));
}

/// Writes the build's manifest to `dest`: `source` patched with the project's version,
/// author and contributors, and stripped of console-excluded nodes for console builds.
pub fn mutate_manifest(source: &Path, dest: &Path, project: &Project, console: bool) -> Result<()> {
    let mut tree = ManifestTree::load(source)?;
    apply(&mut tree, project, console)?;
    tree.save(dest)?;
    debug!("Wrote manifest {}", dest.display());
    Ok(())
}

/// Applies the build's manifest changes to `tree`. Idempotent.
pub fn apply(tree: &mut ManifestTree, project: &Project, console: bool) -> Result<()> {
    let author_path = NodePath::parse("author")?;
    let existing_author = tree.get(&author_path);

    tree.set_or_create(&NodePath::parse("@descVersion")?, MOD_DESC_VERSION);
    tree.set_or_create(
        &NodePath::parse("version")?,
        project.version().unwrap_or(DEFAULT_MOD_VERSION),
    );

    if let Some(author) = project.author().map(str::to_string).or(existing_author) {
        tree.set_or_create(&author_path, &author);
    }

    if !project.contributors().is_empty() {
        tree.set_or_create(&NodePath::parse("contributors")?, &project.contributors().join(", "));
    }

    let removals = console_removals(project)?;
    if console {
        for (raw, path) in removals {
            if !tree.remove(&path) {
                debug!("Console manifest node '{}' not present", raw);
            }
        }
    }

    Ok(())
}

/// Parses the project's console deletion paths.
///
/// A path ending in a positional index is rejected: applied to an already-mutated manifest
/// it would remove a different element. `[@attr=value]` selects a single element instead.
pub fn console_removals(project: &Project) -> Result<Vec<(&str, NodePath)>> {
    project
        .console_del_moddesc()
        .iter()
        .map(|raw| {
            let path = NodePath::parse(raw)?;
            if path.ends_with_index() {
                return Err(Error::ValidationError(format!(
                    "console manifest path '{}' must not end in a position index, select the element by attribute instead",
                    raw
                )));
            }
            Ok((raw.as_str(), path))
        })
        .collect()
}

/// Destination of the manifest inside a staging directory.
pub fn staged_manifest_path(scratch: &Path) -> PathBuf {
    scratch.join(MOD_DESC_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(xml: &str) -> ManifestTree {
        ManifestTree::parse(xml.as_bytes()).unwrap()
    }

    fn path(p: &str) -> NodePath {
        NodePath::parse(p).unwrap()
    }

    #[test]
    fn test_parse_path_segments() {
        assert_eq!(
            path("storeItems/storeItem[1].@xmlFilename").segments(),
            &[
                Segment::Element { name: "storeItems".into(), selector: Selector::All },
                Segment::Element { name: "storeItem".into(), selector: Selector::Index(1) },
                Segment::Attribute("xmlFilename".into()),
            ]
        );
        assert!(NodePath::parse("").is_err());
        assert!(NodePath::parse("@a.b").is_err());
        assert!(NodePath::parse("a[x]").is_err());
        assert!(NodePath::parse("a[@b=c").is_err());
    }

    #[test]
    fn test_parse_attribute_selector_keeps_separators() {
        assert_eq!(
            path("extraSourceFiles.sourceFile[@filename='src/debug.lua']").segments(),
            &[
                Segment::Element { name: "extraSourceFiles".into(), selector: Selector::All },
                Segment::Element {
                    name: "sourceFile".into(),
                    selector: Selector::Attribute {
                        name: "filename".into(),
                        value: "src/debug.lua".into(),
                    },
                },
            ]
        );
        assert!(path("a[2]").ends_with_index());
        assert!(!path("a[2].b").ends_with_index());
    }

    #[test]
    fn test_remove_by_attribute_is_repeatable() {
        let mut t = tree(r#"<m><f n="a"/><f n="b"/><f n="c"/></m>"#);
        assert!(t.remove(&path("f[@n=b]")));
        assert!(!t.remove(&path("f[@n=b]")));
        assert_eq!(t.get(&path("f[1].@n")).as_deref(), Some("c"));
    }

    #[test]
    fn test_set_or_create_with_selector_sets_attribute() {
        let mut t = tree("<m/>");
        t.set_or_create(&path("f[@n=x]"), "text");
        t.set_or_create(&path("f[@n=x]"), "text");
        assert_eq!(t.root().children.len(), 1);
        assert_eq!(t.get(&path("f.@n")).as_deref(), Some("x"));
    }

    #[test]
    fn test_declaration_is_kept() {
        let t = tree("<?xml version=\"1.0\" encoding=\"utf-8\" standalone=\"no\"?>\n<m/>");
        let bytes = t.to_bytes().unwrap();
        assert!(bytes.starts_with(b"<?xml version=\"1.0\" encoding=\"utf-8\" standalone=\"no\"?>\n<m"));

        let bare = tree("<m/>").to_bytes().unwrap();
        assert!(bare.starts_with(b"<m"));
    }

    #[test]
    fn test_set_or_create_creates_nested() {
        let mut t = tree("<modDesc></modDesc>");
        t.set_or_create(&path("modDesc.a.b"), "1");
        t.set_or_create(&path("a.b"), "2");
        assert_eq!(t.get(&path("a.b")).as_deref(), Some("2"));
        assert_eq!(t.root().children.len(), 1);
    }

    #[test]
    fn test_remove_all_and_indexed() {
        let mut t = tree("<m><i>1</i><i>2</i><i>3</i><k/></m>");
        assert!(t.remove(&path("i[1]")));
        assert_eq!(t.get(&path("i[1]")).as_deref(), Some("3"));
        assert!(t.remove(&path("i")));
        assert!(t.get(&path("i")).is_none());
        assert!(!t.remove(&path("missing.node")));
        assert_eq!(t.root().children.len(), 1);
    }

    #[test]
    fn test_attributes() {
        let mut t = tree(r#"<modDesc descVersion="1"/>"#);
        t.set_or_create(&path("@descVersion"), "40");
        assert_eq!(t.get(&path("@descVersion")).as_deref(), Some("40"));
        assert!(t.remove(&path("@descVersion")));
        assert!(t.get(&path("@descVersion")).is_none());
    }
}
