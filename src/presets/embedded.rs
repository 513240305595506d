/// Presets compiled into the binary, keyed by name.
pub fn embedded_presets() -> &'static [(&'static str, &'static str)] {
    &[
        ("circle", include_str!("../../presets/circle.toml")),
        ("classic", include_str!("../../presets/classic.toml")),
        ("led", include_str!("../../presets/led.toml")),
        ("mirror", include_str!("../../presets/mirror.toml")),
        ("wave", include_str!("../../presets/wave.toml")),
    ]
}

pub fn get_embedded(name: &str) -> Option<&'static str> {
    embedded_presets()
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, source)| *source)
}
