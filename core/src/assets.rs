use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

pub(crate) const CONFIG_TOML: &str = "cpst.toml";
pub(crate) const GENVAL_TEMPLATE: &str = "templates/genval.cpp";
pub(crate) const CHECKER_TEMPLATE: &str = "templates/check.cpp";

/// Contents of an embedded text file. Every name above is embedded at build time.
pub(crate) fn text(name: &str) -> String {
    Asset::get(name)
        .map(|file| String::from_utf8_lossy(file.data.as_ref()).into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_asset_is_embedded() {
        for name in [CONFIG_TOML, GENVAL_TEMPLATE, CHECKER_TEMPLATE] {
            assert!(!text(name).is_empty(), "{} is missing", name);
        }
        assert_eq!(text("nope.txt"), "");
    }
}
