//! The `profiles.xml` document.
//!
//! NAPS2 serialises its profiles with .NET's `XmlSerializer`:
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <ArrayOfScanProfile xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
//!   <ScanProfile>
//!     <Version>2</Version>
//!     <Device>
//!       <ID>{6BDD1FC6-810F-11D0-BEC7-08002BE2092F}\0000</ID>
//!       <Name>Canon LiDE 300</Name>
//!     </Device>
//!     ...
//!   </ScanProfile>
//! </ArrayOfScanProfile>
//! ```
//!
//! Parsing keeps every byte that isn't a modelled field as it was read, so
//! [`ProfileDocument::to_xml`] on a document nobody touched returns the input.

use crate::error::{ErrorKind, Result};
use crate::raw::{Child, DEVICE_TAG, Element, Field, Node, PROFILE_TAG, Slot};
use crate::RawProfile;
use exn::ResultExt;
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

const ROOT_TAG: &str = "ArrayOfScanProfile";
const BOM: char = '\u{feff}';
const DEFAULT_PROLOG: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const XSI_DECLARATION: &str = "xmlns:xsi";
const DEFAULT_ROOT: &str = "<ArrayOfScanProfile xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">";
const ENTRY_INDENT: &str = "\n  ";

#[derive(Clone, Debug, PartialEq, Eq)]
enum Item {
    Profile(RawProfile),
    /// Anything under the root that isn't a profile record.
    Other(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Entry {
    lead: String,
    item: Item,
}

/// A parsed `profiles.xml`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileDocument {
    bom: bool,
    /// Everything before the root element: declaration, comments, whitespace.
    prolog: String,
    root_open: String,
    /// `None` when the root was written as an empty element.
    root_close: Option<String>,
    entries: Vec<Entry>,
    /// Whitespace before the root's end tag.
    tail: String,
    /// Everything after the root element.
    epilogue: String,
}

impl Default for ProfileDocument {
    fn default() -> Self {
        Self {
            bom: false,
            prolog: DEFAULT_PROLOG.to_string(),
            root_open: DEFAULT_ROOT.to_string(),
            root_close: Some(format!("</{ROOT_TAG}>")),
            entries: Vec::new(),
            tail: "\n".to_string(),
            epilogue: String::new(),
        }
    }
}

impl ProfileDocument {
    /// Parse a document. An empty (or whitespace-only) input is an empty document.
    pub fn parse(source: &str) -> Result<Self> {
        let (bom, body) = match source.strip_prefix(BOM) {
            Some(body) => (true, body),
            None => (false, source),
        };
        if body.trim().is_empty() {
            return Ok(Self { bom, ..Self::default() });
        }

        let mut reader = Reader::from_str(body);
        let (root_start, root, self_closing) = loop {
            let start = position(&reader);
            match next(&mut reader)? {
                Event::Start(e) => break (start, e, false),
                Event::Empty(e) => break (start, e, true),
                Event::Eof => exn::bail!(ErrorKind::Parse("document has no root element".to_string())),
                _ => {},
            }
        };
        if root.name().as_ref() != ROOT_TAG.as_bytes() {
            exn::bail!(ErrorKind::Parse(format!("unexpected root element <{}>", name_of(&root))));
        }
        let mut document = Self {
            bom,
            prolog: body[..root_start].to_string(),
            root_open: body[root_start..position(&reader)].to_string(),
            root_close: None,
            entries: Vec::new(),
            tail: String::new(),
            epilogue: String::new(),
        };

        if !self_closing {
            let mut lead = String::new();
            loop {
                let start = position(&reader);
                let item = match next(&mut reader)? {
                    Event::Text(_) => {
                        lead.push_str(&body[start..position(&reader)]);
                        continue;
                    },
                    Event::End(_) => {
                        document.tail = lead;
                        document.root_close = Some(body[start..position(&reader)].to_string());
                        break;
                    },
                    Event::Eof => exn::bail!(ErrorKind::Parse(format!("unclosed <{ROOT_TAG}>"))),
                    Event::Start(e) if e.name().as_ref() == PROFILE_TAG.as_bytes() => {
                        let element = parse_element(&mut reader, body, PROFILE_TAG, start, false)?;
                        Item::Profile(RawProfile { element })
                    },
                    Event::Empty(e) if e.name().as_ref() == PROFILE_TAG.as_bytes() => {
                        let element = parse_element(&mut reader, body, PROFILE_TAG, start, true)?;
                        Item::Profile(RawProfile { element })
                    },
                    Event::Start(e) => {
                        reader.read_to_end(e.name()).or_raise(|| malformed(&reader))?;
                        Item::Other(body[start..position(&reader)].to_string())
                    },
                    _ => Item::Other(body[start..position(&reader)].to_string()),
                };
                document.entries.push(Entry { lead: std::mem::take(&mut lead), item });
            }
        }
        document.epilogue = body[position(&reader)..].to_string();
        Ok(document)
    }

    /// Every profile record, in document order.
    pub fn profiles(&self) -> impl Iterator<Item = &RawProfile> {
        self.entries.iter().filter_map(|entry| match &entry.item {
            Item::Profile(profile) => Some(profile),
            Item::Other(_) => None,
        })
    }

    pub fn profiles_mut(&mut self) -> impl Iterator<Item = &mut RawProfile> {
        self.entries.iter_mut().filter_map(|entry| match &mut entry.item {
            Item::Profile(profile) => Some(profile),
            Item::Other(_) => None,
        })
    }

    pub fn find(&self, name: &str) -> Option<&RawProfile> {
        self.profiles().find(|profile| profile.display_name() == Some(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut RawProfile> {
        self.profiles_mut().find(|profile| profile.display_name() == Some(name))
    }

    /// Append a record after the last entry.
    ///
    /// New records mark empty values with `xsi:nil`, so the root gains an
    /// `xmlns:xsi` declaration if it doesn't have one yet.
    pub fn push(&mut self, record: RawProfile) {
        self.declare_xsi();
        let lead = self.entries.last().map_or_else(|| ENTRY_INDENT.to_string(), |entry| entry.lead.clone());
        if self.root_close.is_none() || self.tail.is_empty() {
            self.tail = "\n".to_string();
        }
        self.entries.push(Entry { lead, item: Item::Profile(record) });
    }

    fn declare_xsi(&mut self) {
        if declares_xsi(&self.root_open) {
            return;
        }
        let (head, end) = match self.root_open.strip_suffix("/>") {
            Some(head) => (head, "/>"),
            None => (self.root_open.strip_suffix('>').unwrap_or(&self.root_open), ">"),
        };
        self.root_open = format!("{} {XSI_DECLARATION}=\"{XSI_NAMESPACE}\"{end}", head.trim_end());
    }

    /// Remove the record named `name`, returning whether there was one.
    pub fn remove(&mut self, name: &str) -> bool {
        let position = self.entries.iter().position(|entry| match &entry.item {
            Item::Profile(profile) => profile.display_name() == Some(name),
            Item::Other(_) => false,
        });
        match position {
            Some(index) => {
                self.entries.remove(index);
                true
            },
            None => false,
        }
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        if self.bom {
            out.push(BOM);
        }
        out.push_str(&self.prolog);
        match &self.root_close {
            Some(_) => out.push_str(&self.root_open),
            None if self.entries.is_empty() => out.push_str(&self.root_open),
            None => {
                out.push_str(self.root_open.trim_end_matches("/>").trim_end());
                out.push('>');
            },
        }
        for entry in &self.entries {
            out.push_str(&entry.lead);
            match &entry.item {
                Item::Profile(profile) => profile.element.render(&mut out),
                Item::Other(raw) => out.push_str(raw),
            }
        }
        match &self.root_close {
            Some(close) => {
                out.push_str(&self.tail);
                out.push_str(close);
            },
            None if self.entries.is_empty() => {},
            None => {
                out.push_str(&self.tail);
                out.push_str("</");
                out.push_str(ROOT_TAG);
                out.push('>');
            },
        }
        out.push_str(&self.epilogue);
        out
    }
}

fn declares_xsi(root_open: &str) -> bool {
    let mut reader = Reader::from_str(root_open);
    match reader.read_event() {
        Ok(Event::Start(e) | Event::Empty(e)) => {
            e.attributes().flatten().any(|attr| attr.key.as_ref() == XSI_DECLARATION.as_bytes())
        },
        _ => false,
    }
}

fn position(reader: &Reader<&[u8]>) -> usize {
    reader.buffer_position() as usize
}

fn malformed(reader: &Reader<&[u8]>) -> ErrorKind {
    ErrorKind::Parse(format!("malformed XML near byte {}", reader.buffer_position()))
}

fn next<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Event<'a>> {
    let event = reader.read_event();
    event.or_raise(|| malformed(reader))
}

fn name_of(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

/// Parse the children of the `name` element whose start tag begins at
/// `open_start` and has just been read.
fn parse_element(
    reader: &mut Reader<&[u8]>,
    body: &str,
    name: &'static str,
    open_start: usize,
    self_closing: bool,
) -> Result<Element> {
    let mut element = Element {
        name,
        open: body[open_start..position(reader)].to_string(),
        children: Vec::new(),
        tail: String::new(),
        close: None,
    };
    if self_closing {
        return Ok(element);
    }

    let mut lead = String::new();
    loop {
        let start = position(reader);
        let node = match next(reader)? {
            Event::Text(_) => {
                lead.push_str(&body[start..position(reader)]);
                continue;
            },
            Event::End(_) => {
                element.tail = lead;
                element.close = Some(body[start..position(reader)].to_string());
                return Ok(element);
            },
            Event::Eof => exn::bail!(ErrorKind::Parse(format!("unclosed <{name}>"))),
            Event::Start(e) => {
                let tag = name_of(&e);
                match modelled(&element, &tag) {
                    Some(Modelled::Device) => Node::Device(parse_element(reader, body, DEVICE_TAG, start, false)?),
                    Some(Modelled::Field(field)) => {
                        let inner = reader.read_text(e.name()).or_raise(|| malformed(reader))?;
                        let text = unescape(&inner).or_raise(|| malformed(reader))?.into_owned();
                        Node::Field(field, Slot { text, raw: Some(body[start..position(reader)].to_string()) })
                    },
                    _ => {
                        reader.read_to_end(e.name()).or_raise(|| malformed(reader))?;
                        Node::Opaque { name: tag, raw: body[start..position(reader)].to_string() }
                    },
                }
            },
            Event::Empty(e) => {
                let tag = name_of(&e);
                let raw = body[start..position(reader)].to_string();
                match modelled(&element, &tag) {
                    Some(Modelled::Device) => Node::Device(parse_element(reader, body, DEVICE_TAG, start, true)?),
                    Some(Modelled::Field(field)) => Node::Field(field, Slot { text: String::new(), raw: Some(raw) }),
                    _ => Node::Opaque { name: tag, raw },
                }
            },
            event => {
                let name = if matches!(event, Event::Comment(_)) { "#comment" } else { "#other" };
                Node::Opaque { name: name.to_string(), raw: body[start..position(reader)].to_string() }
            },
        };
        element.children.push(Child { lead: std::mem::take(&mut lead), node });
    }
}

enum Modelled {
    Device,
    Field(Field),
}

/// Whether a child element called `tag` of `parent` is modelled. Only the
/// first occurrence counts; a repeated element is kept as opaque markup.
fn modelled(parent: &Element, tag: &str) -> Option<Modelled> {
    if parent.name == PROFILE_TAG && tag == DEVICE_TAG {
        let seen = parent.children.iter().any(|child| matches!(child.node, Node::Device(_)));
        return (!seen).then_some(Modelled::Device);
    }
    let field = Field::lookup(parent.name, tag)?;
    let seen = parent.children.iter().any(|child| matches!(child.node, Node::Field(f, _) if f == field));
    (!seen).then_some(Modelled::Field(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeviceRef, NewProfile, ProfileUpdate};

    fn template(name: &str) -> RawProfile {
        RawProfile::from_new(&NewProfile::new(name, DeviceRef { id: "a".to_string(), name: "b".to_string() }))
    }

    const SAMPLE: &str = "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>\r
<ArrayOfScanProfile xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\">\r
  <ScanProfile>\r
    <Version>2</Version>\r
    <Device>\r
      <ID>{6BDD1FC6-810F-11D0-BEC7-08002BE2092F}\\0000</ID>\r
      <Name>Canon LiDE 300</Name>\r
      <IconUri xsi:nil=\"true\" />\r
    </Device>\r
    <Caps>\r
      <PaperSources>\r
        <PaperSource>Glass</PaperSource>\r
      </PaperSources>\r
    </Caps>\r
    <DriverName>wia</DriverName>\r
    <DisplayName>Office &amp; Home</DisplayName>\r
    <!-- tuned by hand -->\r
    <IsDefault>true</IsDefault>\r
    <BitDepth>C24Bit</BitDepth>\r
    <PageSize>A4</PageSize>\r
    <Resolution>Dpi300</Resolution>\r
    <PaperSource>Glass</PaperSource>\r
    <KeyValueOptions xsi:nil=\"true\" />\r
  </ScanProfile>\r
</ArrayOfScanProfile>";

    #[test]
    fn test_untouched_round_trip() {
        let document = ProfileDocument::parse(SAMPLE).unwrap();
        assert_eq!(document.to_xml(), SAMPLE);
    }

    #[test]
    fn test_modelled_fields() {
        let document = ProfileDocument::parse(SAMPLE).unwrap();
        let profile = document.profiles().next().unwrap().to_profile().unwrap();
        assert_eq!(profile.display_name, "Office & Home");
        assert_eq!(profile.device.id, "{6BDD1FC6-810F-11D0-BEC7-08002BE2092F}\\0000");
        assert_eq!(profile.page_size, "A4");
        assert!(profile.is_default);
    }

    #[test]
    fn test_nested_paper_source_is_not_modelled() {
        // `Caps` contains its own `PaperSource`; only the direct child counts.
        let document = ProfileDocument::parse(SAMPLE).unwrap();
        let record = document.profiles().next().unwrap();
        let names: Vec<_> = record.extensions().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["Version", "Caps", "#comment", "KeyValueOptions"]);
    }

    #[test]
    fn test_update_only_rewrites_changed_element() {
        let mut document = ProfileDocument::parse(SAMPLE).unwrap();
        let record = document.find_mut("Office & Home").unwrap();
        record.apply(&ProfileUpdate { page_size: Some("Letter".to_string()), ..Default::default() });
        let expected = SAMPLE.replace("<PageSize>A4</PageSize>", "<PageSize>Letter</PageSize>");
        assert_eq!(document.to_xml(), expected);
    }

    #[test]
    fn test_unchanged_value_keeps_markup() {
        let source =
            SAMPLE.replace("<BitDepth>C24Bit</BitDepth>", "<BitDepth xml:space=\"preserve\">C24Bit</BitDepth>");
        let mut document = ProfileDocument::parse(&source).unwrap();
        let record = document.find_mut("Office & Home").unwrap();
        record.apply(&ProfileUpdate { bit_depth: Some("C24Bit".to_string()), ..Default::default() });
        assert_eq!(document.to_xml(), source);
    }

    #[test]
    fn test_empty_input() {
        let document = ProfileDocument::parse("").unwrap();
        assert_eq!(document.profiles().count(), 0);
        assert_eq!(document, ProfileDocument::default());
    }

    #[test]
    fn test_push_into_empty_root() {
        let mut document = ProfileDocument::parse("<?xml version=\"1.0\"?>\n<ArrayOfScanProfile />\n").unwrap();
        document.push(template("Office"));
        let xml = document.to_xml();
        assert!(xml.starts_with(concat!(
            "<?xml version=\"1.0\"?>\n",
            "<ArrayOfScanProfile xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\n",
            "  <ScanProfile>\n    <Version>2</Version>"
        )));
        assert!(xml.ends_with("  </ScanProfile>\n</ArrayOfScanProfile>\n"));
        let reparsed = ProfileDocument::parse(&xml).unwrap();
        assert_eq!(reparsed.find("Office").unwrap().to_profile().unwrap().device.name, "b");
    }

    #[test]
    fn test_push_declares_xsi_once() {
        let mut document = ProfileDocument::parse("<ArrayOfScanProfile a=\"1\">\n</ArrayOfScanProfile>").unwrap();
        document.push(template("Office"));
        document.push(template("Home"));
        let xml = document.to_xml();
        let root = "<ArrayOfScanProfile a=\"1\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">";
        assert!(xml.starts_with(root));
        assert_eq!(xml.matches("xmlns:xsi").count(), 1);

        // A root that already declares it is left alone.
        let mut document = ProfileDocument::parse(SAMPLE).unwrap();
        document.push(template("Home"));
        assert!(document.to_xml().starts_with(&SAMPLE[..SAMPLE.find("<ScanProfile>").unwrap()]));
    }

    #[test]
    fn test_remove_keeps_other_entries() {
        let mut document = ProfileDocument::parse(SAMPLE).unwrap();
        document.push(template("Home"));
        assert!(document.remove("Office & Home"));
        assert!(!document.remove("Office & Home"));
        let names: Vec<_> = document.profiles().filter_map(RawProfile::display_name).collect();
        assert_eq!(names, ["Home"]);
    }

    #[test]
    fn test_malformed() {
        for source in [
            "<ArrayOfScanProfile><ScanProfile></ArrayOfScanProfile>",
            "<ArrayOfScanProfile><ScanProfile>",
            "<Profiles></Profiles>",
            "<!-- nothing -->",
        ] {
            let err = ProfileDocument::parse(source).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Parse(_)), "{source}");
        }
    }
}
