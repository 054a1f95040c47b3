//! Page tree walker.
//!
//! Visits Catalog → Pages → Page depth-first in `/Kids` order and hands each
//! leaf its inherited attributes.

use std::collections::HashSet;

use cidtext_core::BBox;
use tracing::debug;

use crate::document::ObjectGraph;
use crate::error::BackendError;
use crate::object::{Dictionary, ObjectRef, PdfValue};

/// A page leaf with its inherited attributes resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 0-based position in document order.
    pub index: usize,
    /// The page object, when the leaf is an indirect object.
    pub object_ref: Option<ObjectRef>,
    /// Resources merged with every ancestor's, nearest definition winning.
    pub resources: Dictionary,
    /// Content streams in order (references or inline streams).
    pub contents: Vec<PdfValue>,
    pub media_box: Option<BBox>,
    pub crop_box: Option<BBox>,
    /// Rotation in degrees, normalized to 0, 90, 180 or 270.
    pub rotate: i64,
}

impl Page {
    /// CropBox, or MediaBox when the page has no CropBox.
    pub fn visible_box(&self) -> Option<BBox> {
        self.crop_box.or(self.media_box)
    }

    /// The `/Font` resource dictionary, if any.
    pub fn fonts(&self) -> Option<&Dictionary> {
        self.resources.get("Font").and_then(PdfValue::as_dict)
    }
}

/// Attributes passed down from `/Pages` nodes.
#[derive(Debug, Clone, Default)]
struct Inherited {
    resources: Dictionary,
    media_box: Option<BBox>,
    crop_box: Option<BBox>,
    rotate: Option<i64>,
}

impl Inherited {
    /// This node's view: its own entries over the inherited ones.
    fn apply(&self, graph: &ObjectGraph, node: &Dictionary) -> Result<Inherited, BackendError> {
        let resources = match graph.get_resolved(node, "Resources")? {
            Some(own) => merge_resources(graph, &self.resources, own)?,
            None => self.resources.clone(),
        };
        Ok(Inherited {
            resources,
            media_box: rect_entry(graph, node, "MediaBox")?.or(self.media_box),
            crop_box: rect_entry(graph, node, "CropBox")?.or(self.crop_box),
            rotate: graph
                .get_resolved(node, "Rotate")?
                .and_then(PdfValue::as_i64)
                .or(self.rotate),
        })
    }
}

/// Merge a node's `/Resources` over the inherited dictionary, category by
/// category. Within a dictionary-valued category (`/Font`, `/XObject`, …)
/// entries are merged name by name and the node's entry wins; other values
/// are replaced.
fn merge_resources(
    graph: &ObjectGraph,
    inherited: &Dictionary,
    own: &PdfValue,
) -> Result<Dictionary, BackendError> {
    let Some(own) = own.as_dict() else {
        return Ok(inherited.clone());
    };
    let mut merged = inherited.clone();
    for (category, value) in own.iter() {
        let value = graph.resolve(value)?;
        let combined = match (merged.get(category), value) {
            (Some(PdfValue::Dictionary(parent)), PdfValue::Dictionary(child)) => {
                let mut entries = parent.clone();
                for (name, entry) in child.iter() {
                    entries.insert(name.clone(), entry.clone());
                }
                PdfValue::Dictionary(entries)
            }
            _ => value.clone(),
        };
        merged.insert(category.clone(), combined);
    }
    Ok(merged)
}

fn rect_entry(
    graph: &ObjectGraph,
    node: &Dictionary,
    key: &str,
) -> Result<Option<BBox>, BackendError> {
    let Some(PdfValue::Array(items)) = graph.get_resolved(node, key)? else {
        return Ok(None);
    };
    let nums = items
        .iter()
        .map(|v| Ok(graph.resolve(v)?.as_f64()))
        .collect::<Result<Vec<_>, BackendError>>()?;
    match nums.as_slice() {
        [Some(x0), Some(y0), Some(x1), Some(y1)] => Ok(Some(BBox::new(*x0, *y0, *x1, *y1))),
        _ => Ok(None),
    }
}

/// Expand `/Contents` into the list of stream values.
fn contents_of(graph: &ObjectGraph, node: &Dictionary) -> Vec<PdfValue> {
    match node.get("Contents") {
        None => Vec::new(),
        Some(PdfValue::Array(items)) => items.clone(),
        Some(value @ PdfValue::Reference(_)) => match graph.resolve(value) {
            // an indirect array of stream references
            Ok(PdfValue::Array(items)) => items.clone(),
            // a stream, or a failure the interpreter reports for this page
            _ => vec![value.clone()],
        },
        Some(other) => vec![other.clone()],
    }
}

/// Collect all page leaves in document order.
pub fn collect_pages(graph: &ObjectGraph) -> Result<Vec<Page>, BackendError> {
    let catalog = graph.catalog()?;
    let root = catalog
        .get("Pages")
        .ok_or_else(|| BackendError::Parse("catalog has no /Pages".to_string()))?;
    let max_pages = graph.options().max_pages;

    let mut pages = Vec::new();
    let mut visited: HashSet<ObjectRef> = HashSet::new();
    let mut stack: Vec<(PdfValue, Inherited)> = vec![(root.clone(), Inherited::default())];

    while let Some((node_value, inherited)) = stack.pop() {
        if max_pages.is_some_and(|max| pages.len() >= max) {
            debug!(max = ?max_pages, "page limit reached");
            break;
        }

        let object_ref = node_value.as_reference();
        if let Some(r) = object_ref {
            if !visited.insert(r) {
                return Err(BackendError::CyclicPageTree(r));
            }
        }
        let node = graph.resolve_dict(&node_value)?;
        let attrs = inherited.apply(graph, node)?;

        let is_tree_node = match node.type_name() {
            Some("Pages") => true,
            Some("Page") => false,
            _ => node.contains_key("Kids"),
        };

        if is_tree_node {
            let kids = match graph.get_resolved(node, "Kids")? {
                Some(PdfValue::Array(kids)) => kids.as_slice(),
                _ => &[],
            };
            for kid in kids.iter().rev() {
                stack.push((kid.clone(), attrs.clone()));
            }
        } else {
            pages.push(Page {
                index: pages.len(),
                object_ref,
                resources: attrs.resources,
                contents: contents_of(graph, node),
                media_box: attrs.media_box,
                crop_box: attrs.crop_box,
                rotate: attrs.rotate.unwrap_or(0).rem_euclid(360),
            });
        }
    }

    debug!(pages = pages.len(), "page tree walked");
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::build_pdf;

    fn load(bodies: &[&str]) -> ObjectGraph {
        ObjectGraph::load(&build_pdf(bodies, "")).unwrap()
    }

    fn font_ref(page: &Page, name: &str) -> Option<ObjectRef> {
        page.fonts()
            .and_then(|f| f.get(name))
            .and_then(PdfValue::as_reference)
    }

    #[test]
    fn single_page() {
        let graph = load(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] >>",
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>",
            "<< /Length 0 >>\nstream\n\nendstream",
        ]);
        let pages = collect_pages(&graph).unwrap();
        assert_eq!(pages.len(), 1);
        let page = &pages[0];
        assert_eq!(page.index, 0);
        assert_eq!(page.object_ref, Some(ObjectRef::new(3, 0)));
        assert_eq!(page.media_box, Some(BBox::new(0.0, 0.0, 612.0, 792.0)));
        assert_eq!(page.visible_box(), page.media_box);
        assert_eq!(
            page.contents,
            vec![PdfValue::Reference(ObjectRef::new(4, 0))]
        );
    }

    #[test]
    fn depth_first_kids_order() {
        // Pages(root) -> [Pages A -> [P1, P2], P3]
        let graph = load(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R 6 0 R] /Count 3 >>",
            "<< /Type /Pages /Parent 2 0 R /Kids [4 0 R 5 0 R] /Count 2 >>",
            "<< /Type /Page /Parent 3 0 R /Rotate 90 >>",
            "<< /Type /Page /Parent 3 0 R /Rotate 180 >>",
            "<< /Type /Page /Parent 2 0 R /Rotate -90 >>",
        ]);
        let pages = collect_pages(&graph).unwrap();
        let refs: Vec<u32> = pages.iter().map(|p| p.object_ref.unwrap().id).collect();
        assert_eq!(refs, vec![4, 5, 6]);
        let rotations: Vec<i64> = pages.iter().map(|p| p.rotate).collect();
        assert_eq!(rotations, vec![90, 180, 270]);
    }

    #[test]
    fn fonts_inherited_and_shadowed() {
        let graph = load(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R 4 0 R] /Resources << /Font << /C2_0 10 0 R /C2_1 11 0 R >> >> >>",
            "<< /Type /Page /Parent 2 0 R >>",
            "<< /Type /Page /Parent 2 0 R /Resources << /Font << /C2_0 12 0 R >> >> >>",
        ]);
        let pages = collect_pages(&graph).unwrap();
        // first page has no resources of its own
        assert_eq!(font_ref(&pages[0], "C2_0"), Some(ObjectRef::new(10, 0)));
        // own entry wins, sibling entries still inherited
        assert_eq!(font_ref(&pages[1], "C2_0"), Some(ObjectRef::new(12, 0)));
        assert_eq!(font_ref(&pages[1], "C2_1"), Some(ObjectRef::new(11, 0)));
    }

    #[test]
    fn indirect_resource_categories_are_merged() {
        let graph = load(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] /Resources 4 0 R >>",
            "<< /Type /Page /Parent 2 0 R /Resources << /Font 5 0 R >> >>",
            "<< /Font << /F1 20 0 R >> >>",
            "<< /F2 21 0 R >>",
        ]);
        let pages = collect_pages(&graph).unwrap();
        assert_eq!(font_ref(&pages[0], "F1"), Some(ObjectRef::new(20, 0)));
        assert_eq!(font_ref(&pages[0], "F2"), Some(ObjectRef::new(21, 0)));
    }

    #[test]
    fn crop_box_inherited_and_overridden() {
        let graph = load(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R 4 0 R] /MediaBox [0 0 600 800] /CropBox [10 10 590 790] >>",
            "<< /Type /Page /Parent 2 0 R >>",
            "<< /Type /Page /Parent 2 0 R /CropBox [0 0 300 400] >>",
        ]);
        let pages = collect_pages(&graph).unwrap();
        assert_eq!(pages[0].crop_box, Some(BBox::new(10.0, 10.0, 590.0, 790.0)));
        assert_eq!(pages[1].crop_box, Some(BBox::new(0.0, 0.0, 300.0, 400.0)));
        assert_eq!(pages[1].media_box, Some(BBox::new(0.0, 0.0, 600.0, 800.0)));
    }

    #[test]
    fn contents_array_kept_in_order() {
        let graph = load(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] >>",
            "<< /Type /Page /Contents [5 0 R 4 0 R] >>",
        ]);
        let pages = collect_pages(&graph).unwrap();
        assert_eq!(
            pages[0].contents,
            vec![
                PdfValue::Reference(ObjectRef::new(5, 0)),
                PdfValue::Reference(ObjectRef::new(4, 0)),
            ]
        );
    }

    #[test]
    fn indirect_contents_array_expanded() {
        let graph = load(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] >>",
            "<< /Type /Page /Contents 4 0 R >>",
            "[7 0 R 8 0 R]",
        ]);
        let pages = collect_pages(&graph).unwrap();
        assert_eq!(pages[0].contents.len(), 2);
    }

    #[test]
    fn missing_type_inferred_from_kids() {
        let graph = load(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Kids [3 0 R] >>",
            "<< /Contents 9 0 R >>",
        ]);
        let pages = collect_pages(&graph).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].object_ref, Some(ObjectRef::new(3, 0)));
    }

    #[test]
    fn cycle_through_ancestor_rejected() {
        let graph = load(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] >>",
            "<< /Type /Pages /Kids [2 0 R] >>",
        ]);
        assert_eq!(
            collect_pages(&graph),
            Err(BackendError::CyclicPageTree(ObjectRef::new(2, 0)))
        );
    }

    #[test]
    fn page_listed_twice_rejected() {
        let graph = load(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R 3 0 R] >>",
            "<< /Type /Page >>",
        ]);
        assert_eq!(
            collect_pages(&graph),
            Err(BackendError::CyclicPageTree(ObjectRef::new(3, 0)))
        );
    }

    #[test]
    fn max_pages_caps_collection() {
        let data = build_pdf(
            &[
                "<< /Type /Catalog /Pages 2 0 R >>",
                "<< /Type /Pages /Kids [3 0 R 4 0 R 5 0 R] >>",
                "<< /Type /Page >>",
                "<< /Type /Page >>",
                "<< /Type /Page >>",
            ],
            "",
        );
        let options = cidtext_core::ExtractOptions {
            max_pages: Some(2),
            ..Default::default()
        };
        let graph = ObjectGraph::load_with_options(&data, options).unwrap();
        assert_eq!(collect_pages(&graph).unwrap().len(), 2);
    }

    #[test]
    fn unresolvable_kid_is_an_error() {
        let graph = load(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [40 0 R] >>",
        ]);
        assert_eq!(
            collect_pages(&graph),
            Err(BackendError::UnresolvedReference(ObjectRef::new(40, 0)))
        );
    }
}
