// this_file: crates/fontval-core/src/params.rs

//! Run-wide validator parameters: which tables to test and how to rasterize

use crate::{devmetrics::DevMetricsRequest, sfnt::parse_tag, types::Tag, RasterRunConfig};

/// Tables the validator knows how to check, in report order
pub const KNOWN_TABLES: &[&str] = &[
    "avar", "BASE", "CFF ", "cmap", "cvt ", "DSIG", "EBDT", "EBLC", "EBSC", "fpgm", "fvar",
    "gasp", "GDEF", "glyf", "GPOS", "GSUB", "gvar", "hdmx", "head", "hhea", "hmtx", "JSTF",
    "kern", "loca", "LTSH", "MATH", "maxp", "name", "OS/2", "PCLT", "post", "prep", "STAT",
    "VDMX", "vhea", "vmtx", "VORG",
];

/// The parameters a validation run is started with
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ValidatorParameters {
    /// Tags to table-test; `None` tests every table the font carries
    #[cfg_attr(feature = "serde", serde(with = "tag_list"))]
    pub tables: Option<Vec<Tag>>,
    pub raster_testing: bool,
    pub raster: RasterRunConfig,
    pub dev_metrics: DevMetricsRequest,
}

impl Default for ValidatorParameters {
    fn default() -> Self {
        Self {
            tables: None,
            raster_testing: true,
            raster: RasterRunConfig::default(),
            dev_metrics: DevMetricsRequest::default(),
        }
    }
}

impl ValidatorParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one tag to the explicit list, switching off "all tables"
    pub fn add_table(&mut self, tag: Tag) -> &mut Self {
        let tables = self.tables.get_or_insert_with(Vec::new);
        if !tables.contains(&tag) {
            tables.push(tag);
        }
        self
    }

    /// Remove a tag and return how many entries were removed
    ///
    /// Removing from "all tables" first expands it to the known table list.
    pub fn remove_table(&mut self, tag: Tag) -> usize {
        let tables = self.tables.get_or_insert_with(known_tags);
        let before = tables.len();
        tables.retain(|t| *t != tag);
        before - tables.len()
    }

    pub fn set_all_tables(&mut self) -> &mut Self {
        self.tables = None;
        self
    }

    pub fn clear_tables(&mut self) -> &mut Self {
        self.tables = Some(Vec::new());
        self
    }

    pub fn set_raster_testing(&mut self, enabled: bool) -> &mut Self {
        self.raster_testing = enabled;
        self
    }

    pub fn tests_all_tables(&self) -> bool {
        self.tables.is_none()
    }

    /// The subset of `present` to test, in the order given
    pub fn tables_to_test(&self, present: &[Tag]) -> Vec<Tag> {
        match &self.tables {
            None => present.to_vec(),
            Some(selected) => present
                .iter()
                .copied()
                .filter(|t| selected.contains(t))
                .collect(),
        }
    }
}

fn known_tags() -> Vec<Tag> {
    KNOWN_TABLES.iter().filter_map(|name| parse_tag(name)).collect()
}

#[cfg(feature = "serde")]
mod tag_list {
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    use crate::{sfnt::parse_tag, types::Tag};

    pub fn serialize<S: Serializer>(tags: &Option<Vec<Tag>>, s: S) -> Result<S::Ok, S::Error> {
        tags.as_ref()
            .map(|tags| tags.iter().map(|t| t.to_string()).collect::<Vec<_>>())
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<Tag>>, D::Error> {
        let names = Option::<Vec<String>>::deserialize(d)?;
        names
            .map(|names| {
                names
                    .iter()
                    .map(|n| parse_tag(n).ok_or_else(|| D::Error::custom(format!("bad tag {n:?}"))))
                    .collect()
            })
            .transpose()
    }
}
