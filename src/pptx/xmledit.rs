//! Targeted XML surgery on part bodies.
//!
//! Reads go through quick-xml; writes splice bytes with memchr so that
//! untouched markup survives byte-for-byte. Only the id-list elements of
//! `p:presentation` and `p:sldMaster` bodies and the counter elements of
//! `app.xml` are ever rewritten.

use crate::opc::error::Result;
use memchr::memmem;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashSet;

/// One `<p:sldId/>`-shaped child of an id list. Master and notes lists
/// leave `id` unset when the schema carries no numeric id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListEntry {
    pub id: Option<u32>,
    pub rid: Option<String>,
}

/// Locate `<{qname}` followed by a name boundary, so `p:sldId` never
/// matches `p:sldIdLst`.
fn elem_open(xml: &[u8], qname: &str) -> Option<usize> {
    let needle = {
        let mut s = String::with_capacity(qname.len() + 1);
        s.push('<');
        s.push_str(qname);
        s
    };
    let finder = memmem::Finder::new(needle.as_bytes());
    let mut at = 0;
    while let Some(pos) = finder.find(&xml[at..]) {
        let abs = at + pos;
        let after = abs + needle.len();
        match xml.get(after) {
            Some(b' ') | Some(b'>') | Some(b'/') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                return Some(abs);
            },
            Some(_) => at = after,
            None => return None,
        }
    }
    None
}

/// Splice `entry` as the last child of the `list` element, creating the
/// list if the body lacks it. A created list lands before the first marker
/// from `successors` that appears in the body, or before the root close
/// tag when none does, which keeps the children in schema order.
pub(crate) fn append_into_list(
    xml: &[u8],
    list: &str,
    entry: &str,
    successors: &[&str],
) -> Vec<u8> {
    let close = format!("</{list}>");
    if let Some(pos) = memmem::find(xml, close.as_bytes()) {
        return splice(xml, pos, pos, entry.as_bytes());
    }

    if let Some(open) = elem_open(xml, list) {
        if let Some(gt) = memchr::memchr(b'>', &xml[open..]) {
            let gt = open + gt;
            if xml[gt - 1] == b'/' {
                // Expand `<list/>` into an open and close pair around the entry.
                let mut inner = String::with_capacity(list.len() * 2 + entry.len() + 6);
                inner.push('<');
                inner.push_str(list);
                inner.push('>');
                inner.push_str(entry);
                inner.push_str(&close);
                return splice(xml, open, gt + 1, inner.as_bytes());
            }
            // Open tag without a close tag; tolerate by inserting right after it.
            return splice(xml, gt + 1, gt + 1, entry.as_bytes());
        }
    }

    let mut wrapped = String::with_capacity(list.len() * 2 + entry.len() + 6);
    wrapped.push('<');
    wrapped.push_str(list);
    wrapped.push('>');
    wrapped.push_str(entry);
    wrapped.push_str(&close);

    let at = successors
        .iter()
        .filter_map(|succ| elem_open(xml, succ))
        .min()
        .or_else(|| memmem::rfind(xml, b"</"))
        .unwrap_or(xml.len());
    splice(xml, at, at, wrapped.as_bytes())
}

/// Replace the entire child content of the `list` element. None when the
/// body has no such element or its close tag is missing.
pub(crate) fn replace_list(xml: &[u8], list: &str, new_inner: &str) -> Option<Vec<u8>> {
    let open = elem_open(xml, list)?;
    let gt = open + memchr::memchr(b'>', &xml[open..])?;

    if xml[gt - 1] == b'/' {
        if new_inner.is_empty() {
            return None;
        }
        let mut inner = String::with_capacity(list.len() * 2 + new_inner.len() + 6);
        inner.push('<');
        inner.push_str(list);
        inner.push('>');
        inner.push_str(new_inner);
        inner.push_str("</");
        inner.push_str(list);
        inner.push('>');
        return Some(splice(xml, open, gt + 1, inner.as_bytes()));
    }

    let close = format!("</{list}>");
    let close_at = memmem::find(&xml[gt + 1..], close.as_bytes())? + gt + 1;
    Some(splice(xml, gt + 1, close_at, new_inner.as_bytes()))
}

/// Byte range of the child content of the `list` element. None when the
/// body has no such element or its close tag is missing; a self-closing
/// element yields an empty range.
pub(crate) fn list_inner(xml: &[u8], list: &str) -> Option<(usize, usize)> {
    let open = elem_open(xml, list)?;
    let gt = open + memchr::memchr(b'>', &xml[open..])?;
    if xml[gt - 1] == b'/' {
        return Some((gt + 1, gt + 1));
    }
    let close = format!("</{list}>");
    let close_at = memmem::find(&xml[gt + 1..], close.as_bytes())? + gt + 1;
    Some((gt + 1, close_at))
}

fn splice(xml: &[u8], start: usize, end: usize, insert: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(xml.len() - (end - start) + insert.len());
    out.extend_from_slice(&xml[..start]);
    out.extend_from_slice(insert);
    out.extend_from_slice(&xml[end..]);
    out
}

/// Collect the id-list children named `entry_local` in document order.
pub(crate) fn list_entries(xml: &[u8], entry_local: &[u8]) -> Result<Vec<ListEntry>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => {
                if e.local_name().as_ref() == entry_local {
                    let mut id = None;
                    let mut rid = None;
                    for attr in e.attributes() {
                        let attr = attr?;
                        match attr.key.as_ref() {
                            b"id" => {
                                let value = attr.unescape_value()?;
                                id = atoi_simd::parse::<u32>(value.as_bytes()).ok();
                            },
                            b"r:id" => rid = Some(attr.unescape_value()?.to_string()),
                            _ => {},
                        }
                    }
                    entries.push(ListEntry { id, rid });
                }
            },
            Event::Eof => break,
            _ => {},
        }
        buf.clear();
    }
    Ok(entries)
}

/// Collect the numeric `attr` values of every element named `elem_local`,
/// in document order. Values that do not parse as an unsigned int are
/// skipped.
pub(crate) fn numeric_attr_values(xml: &[u8], elem_local: &[u8], attr: &[u8]) -> Result<Vec<u32>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut values = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => {
                if e.local_name().as_ref() == elem_local {
                    for candidate in e.attributes() {
                        let candidate = candidate?;
                        if candidate.key.as_ref() == attr {
                            let value = candidate.unescape_value()?;
                            if let Ok(parsed) = atoi_simd::parse::<u32>(value.as_bytes()) {
                                values.push(parsed);
                            }
                        }
                    }
                }
            },
            Event::Eof => break,
            _ => {},
        }
        buf.clear();
    }
    Ok(values)
}

/// Relationship attributes that can reference an rId from drawing markup.
const RID_ATTRS: [&[u8]; 7] = [
    b"r:id=",
    b"r:embed=",
    b"r:link=",
    b"r:dm=",
    b"r:lo=",
    b"r:qs=",
    b"r:cs=",
];

/// Every rId the body references through a relationship attribute. Both
/// quote styles are accepted; a value ends at the quote character that
/// opened it.
pub(crate) fn body_rid_refs(xml: &[u8]) -> HashSet<String> {
    let mut refs = HashSet::new();
    for attr in RID_ATTRS {
        for pos in memmem::find_iter(xml, attr) {
            let quote_at = pos + attr.len();
            let quote = match xml.get(quote_at) {
                Some(&q) if q == b'"' || q == b'\'' => q,
                _ => continue,
            };
            let value_at = quote_at + 1;
            if let Some(end) = memchr::memchr(quote, &xml[value_at..]) {
                if let Ok(rid) = std::str::from_utf8(&xml[value_at..value_at + end]) {
                    refs.insert(rid.to_string());
                }
            }
        }
    }
    refs
}

fn set_counter(xml: &[u8], name: &str, value: usize) -> Option<Vec<u8>> {
    let open = format!("<{name}>");
    let close = format!("</{name}>");
    let start = memmem::find(xml, open.as_bytes())?;
    let text_at = start + open.len();
    let end = memmem::find(&xml[text_at..], close.as_bytes())? + text_at;

    let digits = itoa::Buffer::new().format(value).to_string();
    if &xml[text_at..end] == digits.as_bytes() {
        return None;
    }
    Some(splice(xml, text_at, end, digits.as_bytes()))
}

/// Refresh the `Slides` and `Notes` counters of an `app.xml` body. None
/// when both already match or the counters are absent.
pub(crate) fn set_app_counts(xml: &[u8], slides: usize, notes: usize) -> Option<Vec<u8>> {
    let mut out: Option<Vec<u8>> = None;
    if let Some(updated) = set_counter(out.as_deref().unwrap_or(xml), "Slides", slides) {
        out = Some(updated);
    }
    if let Some(updated) = set_counter(out.as_deref().unwrap_or(xml), "Notes", notes) {
        out = Some(updated);
    }
    out
}
