//! Raw profile records.
//!
//! A `<ScanProfile>` element holds around forty settings, of which only a
//! handful are modelled by [`ScanProfile`]. The rest belong to NAPS2 and must
//! come back out exactly as they went in. A [`RawProfile`] is therefore a
//! lossless tree: modelled fields are typed [`Slot`]s, everything else is an
//! opaque run of markup kept in document order, and the whitespace between
//! children is kept as well. Rendering an unmodified record reproduces the
//! source bytes; modifying a field only re-renders that one element.

use crate::error::{ErrorKind, Result};
use crate::{DeviceRef, DriverName, NewProfile, ProfileUpdate, ScanProfile};
use quick_xml::escape::escape;

pub(crate) const PROFILE_TAG: &str = "ScanProfile";
pub(crate) const DEVICE_TAG: &str = "Device";

const RECORD_INDENT: &str = "\n    ";
const DEVICE_INDENT: &str = "\n      ";

/// Elements this crate reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Field {
    DisplayName,
    IsDefault,
    DriverName,
    BitDepth,
    PageSize,
    Resolution,
    PaperSource,
    DeviceId,
    DeviceName,
}

impl Field {
    const PROFILE: [Self; 7] = [
        Self::DisplayName,
        Self::IsDefault,
        Self::DriverName,
        Self::BitDepth,
        Self::PageSize,
        Self::Resolution,
        Self::PaperSource,
    ];
    const DEVICE: [Self; 2] = [Self::DeviceId, Self::DeviceName];

    pub(crate) fn tag(self) -> &'static str {
        match self {
            Self::DisplayName => "DisplayName",
            Self::IsDefault => "IsDefault",
            Self::DriverName => "DriverName",
            Self::BitDepth => "BitDepth",
            Self::PageSize => "PageSize",
            Self::Resolution => "Resolution",
            Self::PaperSource => "PaperSource",
            Self::DeviceId => "ID",
            Self::DeviceName => "Name",
        }
    }

    /// The modelled field called `tag` among the children of a `record` element.
    pub(crate) fn lookup(record: &str, tag: &str) -> Option<Self> {
        let candidates: &[Self] = match record {
            PROFILE_TAG => &Self::PROFILE,
            DEVICE_TAG => &Self::DEVICE,
            _ => &[],
        };
        candidates.iter().copied().find(|field| field.tag() == tag)
    }

    fn in_device(self) -> bool {
        Self::DEVICE.contains(&self)
    }
}

/// The value of a modelled field, plus the markup it was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Slot {
    pub(crate) text: String,
    /// Verbatim source markup; dropped as soon as `text` changes.
    pub(crate) raw: Option<String>,
}

impl Slot {
    pub(crate) fn fresh(text: impl Into<String>) -> Self {
        Self { text: text.into(), raw: None }
    }

    fn set(&mut self, text: &str) {
        if self.text != text {
            self.text = text.to_string();
            self.raw = None;
        }
    }

    fn render(&self, tag: &str, out: &mut String) {
        match &self.raw {
            Some(raw) => out.push_str(raw),
            None if self.text.is_empty() => {
                out.push('<');
                out.push_str(tag);
                out.push_str(" />");
            },
            None => {
                out.push('<');
                out.push_str(tag);
                out.push('>');
                out.push_str(&escape(self.text.as_str()));
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Node {
    Field(Field, Slot),
    Device(Element),
    /// Anything unmodelled: an element subtree, comment or processing
    /// instruction, kept as the exact markup it was read as.
    Opaque { name: String, raw: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Child {
    /// Whitespace (or stray text) between the previous sibling and this one.
    pub(crate) lead: String,
    pub(crate) node: Node,
}

/// An element with modelled children: a `<ScanProfile>` or its `<Device>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Element {
    pub(crate) name: &'static str,
    /// The start tag exactly as read, attributes included.
    pub(crate) open: String,
    pub(crate) children: Vec<Child>,
    /// Whitespace before the end tag.
    pub(crate) tail: String,
    /// The end tag exactly as read; `None` when the element was self-closing.
    pub(crate) close: Option<String>,
}

impl Element {
    pub(crate) fn empty(name: &'static str, tail: &str) -> Self {
        Self {
            name,
            open: format!("<{name}>"),
            children: Vec::new(),
            tail: tail.to_string(),
            close: Some(format!("</{name}>")),
        }
    }

    fn push(&mut self, lead: &str, node: Node) {
        self.children.push(Child { lead: lead.to_string(), node });
    }

    fn slot(&self, field: Field) -> Option<&Slot> {
        self.children.iter().find_map(|child| match &child.node {
            Node::Field(f, slot) if *f == field => Some(slot),
            _ => None,
        })
    }

    fn slot_mut(&mut self, field: Field) -> Option<&mut Slot> {
        self.children.iter_mut().find_map(|child| match &mut child.node {
            Node::Field(f, slot) if *f == field => Some(slot),
            _ => None,
        })
    }

    fn device(&self) -> Option<&Element> {
        self.children.iter().find_map(|child| match &child.node {
            Node::Device(device) => Some(device),
            _ => None,
        })
    }

    fn device_mut(&mut self) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|child| match &mut child.node {
            Node::Device(device) => Some(device),
            _ => None,
        })
    }

    /// Append an empty `<Device>` unless the record already has one.
    fn ensure_device(&mut self) {
        if self.device().is_none() {
            let lead = self.next_lead(RECORD_INDENT);
            self.push(&lead, Node::Device(Element::empty(DEVICE_TAG, RECORD_INDENT)));
        }
    }

    /// Indentation for a newly appended child, copied from the last one.
    fn next_lead(&self, fallback: &str) -> String {
        self.children.last().map_or_else(|| fallback.to_string(), |child| child.lead.clone())
    }

    /// Set `field` to `text`, appending the element if the record lacks it.
    fn set(&mut self, field: Field, text: &str) {
        match self.slot_mut(field) {
            Some(slot) => slot.set(text),
            None => {
                let lead = self.next_lead(if self.name == DEVICE_TAG { DEVICE_INDENT } else { RECORD_INDENT });
                self.push(&lead, Node::Field(field, Slot::fresh(text)));
            },
        }
    }

    pub(crate) fn render(&self, out: &mut String) {
        let self_closing = self.close.is_none();
        if self_closing && self.children.is_empty() {
            out.push_str(&self.open);
            return;
        }
        if self_closing {
            // `<Device />` that gained children since it was read.
            out.push_str(self.open.trim_end_matches("/>").trim_end());
            out.push('>');
        } else {
            out.push_str(&self.open);
        }
        for child in &self.children {
            out.push_str(&child.lead);
            match &child.node {
                Node::Field(field, slot) => slot.render(field.tag(), out),
                Node::Device(device) => device.render(out),
                Node::Opaque { raw, .. } => out.push_str(raw),
            }
        }
        out.push_str(&self.tail);
        match &self.close {
            Some(close) => out.push_str(close),
            None => {
                out.push_str("</");
                out.push_str(self.name);
                out.push('>');
            },
        }
    }
}

/// One `<ScanProfile>` record, kept losslessly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawProfile {
    pub(crate) element: Element,
}

impl RawProfile {
    /// A fresh record for `input`, with every unmodelled setting at NAPS2's default.
    pub fn from_new(input: &NewProfile) -> Self {
        let mut element = Element::empty(PROFILE_TAG, "\n  ");
        let mut device = Element::empty(DEVICE_TAG, RECORD_INDENT);
        device.push(DEVICE_INDENT, Node::Field(Field::DeviceId, Slot::fresh(&input.device.id)));
        device.push(DEVICE_INDENT, Node::Field(Field::DeviceName, Slot::fresh(&input.device.name)));
        device.push(DEVICE_INDENT, nil("IconUri"));
        device.push(DEVICE_INDENT, nil("ConnectionUri"));

        let modelled = |field: Field, text: &str| Node::Field(field, Slot::fresh(text));
        let nodes = [
            setting("Version", "2"),
            Node::Device(device),
            modelled(Field::DriverName, input.driver_name.tag()),
            modelled(Field::DisplayName, &input.display_name),
            setting("IconID", "0"),
            setting("MaxQuality", "false"),
            modelled(Field::IsDefault, bool_text(input.is_default)),
            setting("UseNativeUI", "false"),
            setting("AfterScanScale", "OneToOne"),
            setting("Brightness", "0"),
            setting("Contrast", "0"),
            modelled(Field::BitDepth, &input.bit_depth),
            setting("PageAlign", "Right"),
            modelled(Field::PageSize, &input.page_size),
            nil("CustomPageSizeName"),
            nil("CustomPageSize"),
            modelled(Field::Resolution, &input.resolution),
            modelled(Field::PaperSource, &input.paper_source),
            setting("EnableAutoSave", "false"),
            nil("AutoSaveSettings"),
            setting("Quality", "75"),
            setting("AutoDeskew", "false"),
            setting("RotateDegrees", "0"),
            setting("BrightnessContrastAfterScan", "false"),
            setting("ForcePageSize", "false"),
            setting("ForcePageSizeCrop", "false"),
            setting("TwainImpl", "Default"),
            setting("TwainProgress", "false"),
            setting("ExcludeBlankPages", "false"),
            setting("BlankPageWhiteThreshold", "70"),
            setting("BlankPageCoverageThreshold", "25"),
            setting("WiaOffsetWidth", "false"),
            setting("WiaRetryOnFailure", "false"),
            setting("WiaDelayBetweenScans", "false"),
            setting("WiaDelayBetweenScansSeconds", "2"),
            setting("WiaVersion", "Default"),
            setting("FlipDuplexedPages", "false"),
            nil("KeyValueOptions"),
        ];
        for node in nodes {
            element.push(RECORD_INDENT, node);
        }
        Self { element }
    }

    fn text(&self, field: Field) -> Option<&str> {
        let owner = if field.in_device() { self.element.device()? } else { &self.element };
        owner.slot(field).map(|slot| slot.text.as_str())
    }

    fn set(&mut self, field: Field, text: &str) {
        if field.in_device() {
            self.element.ensure_device();
            if let Some(device) = self.element.device_mut() {
                device.set(field, text);
            }
        } else {
            self.element.set(field, text);
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        self.text(Field::DisplayName)
    }

    pub fn is_default(&self) -> bool {
        self.text(Field::IsDefault) == Some("true")
    }

    /// Mark this record as not the default. Records that don't say they are
    /// the default are left alone, so their markup stays untouched.
    pub fn clear_default(&mut self) {
        if self.is_default() {
            self.set(Field::IsDefault, "false");
        }
    }

    /// Apply every field present in `update`.
    pub fn apply(&mut self, update: &ProfileUpdate) {
        if let Some(name) = &update.display_name {
            self.set(Field::DisplayName, name);
        }
        if let Some(is_default) = update.is_default {
            self.set(Field::IsDefault, bool_text(is_default));
        }
        if let Some(device) = &update.device {
            if let Some(id) = &device.id {
                self.set(Field::DeviceId, id);
            }
            if let Some(name) = &device.name {
                self.set(Field::DeviceName, name);
            }
        }
        if let Some(driver) = update.driver_name {
            self.set(Field::DriverName, driver.tag());
        }
        let strings = [
            (Field::BitDepth, &update.bit_depth),
            (Field::PageSize, &update.page_size),
            (Field::Resolution, &update.resolution),
            (Field::PaperSource, &update.paper_source),
        ];
        for (field, value) in strings {
            if let Some(value) = value {
                self.set(field, value);
            }
        }
    }

    /// The modelled view of this record.
    ///
    /// Missing fields read as empty, except that a record must have a display
    /// name and a driver NAPS2 would recognise.
    pub fn to_profile(&self) -> Result<ScanProfile> {
        let text = |field| self.text(field).unwrap_or_default().to_string();
        let display_name = text(Field::DisplayName);
        if display_name.is_empty() {
            exn::bail!(ErrorKind::Parse("a profile record has no display name".to_string()));
        }
        let tag = self.text(Field::DriverName).unwrap_or_default();
        let Some(driver_name) = DriverName::from_tag(tag) else {
            exn::bail!(ErrorKind::Parse(format!("profile '{display_name}' has unknown driver '{tag}'")));
        };
        Ok(ScanProfile {
            is_default: self.is_default(),
            device: DeviceRef { id: text(Field::DeviceId), name: text(Field::DeviceName) },
            driver_name,
            bit_depth: text(Field::BitDepth),
            page_size: text(Field::PageSize),
            resolution: text(Field::Resolution),
            paper_source: text(Field::PaperSource),
            display_name,
        })
    }

    /// Every unmodelled child of the record, in document order, as
    /// `(element name, verbatim markup)`. Comments are named `#comment`.
    pub fn extensions(&self) -> Vec<(&str, &str)> {
        self.element
            .children
            .iter()
            .filter_map(|child| match &child.node {
                Node::Opaque { name, raw } => Some((name.as_str(), raw.as_str())),
                _ => None,
            })
            .collect()
    }

    /// The record's markup, from `<ScanProfile>` to `</ScanProfile>`.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.element.render(&mut out);
        out
    }
}

fn bool_text(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn setting(name: &str, value: &str) -> Node {
    Node::Opaque { name: name.to_string(), raw: format!("<{name}>{value}</{name}>") }
}

fn nil(name: &str) -> Node {
    Node::Opaque { name: name.to_string(), raw: format!("<{name} xsi:nil=\"true\" />") }
}
