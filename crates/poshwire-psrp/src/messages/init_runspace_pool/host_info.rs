use crate::ps_value::{
    ComplexObject, ComplexObjectContent, Container, PsPrimitiveValue, PsType, PsValue,
};

use super::super::decode;

/// Console cell position, serialised as a typed `{x, y}` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
}

/// Console extent, serialised as a typed `{width, height}` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// The host console snapshot sent with INIT_RUNSPACEPOOL, keyed 0..=9 in
/// the `_hostDefaultData` dictionary.
///
/// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/510fd8f3-e3ac-45b4-8622-0ab79f6e1f7f
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct HostDefaultData {
    /// `System.ConsoleColor` value.
    #[builder(default = 7)]
    pub foreground_color: i32,
    #[builder(default = 0)]
    pub background_color: i32,
    #[builder(default)]
    pub cursor_position: Coordinates,
    #[builder(default)]
    pub window_position: Coordinates,
    #[builder(default = 25)]
    pub cursor_size: i32,
    #[builder(default = Size { width: 120, height: 3000 })]
    pub buffer_size: Size,
    #[builder(default = Size { width: 120, height: 50 })]
    pub window_size: Size,
    #[builder(default = Size { width: 120, height: 50 })]
    pub max_window_size: Size,
    #[builder(default = Size { width: 120, height: 50 })]
    pub max_physical_window_size: Size,
    #[builder(default, setter(into))]
    pub window_title: String,
}

impl Default for HostDefaultData {
    fn default() -> Self {
        Self::builder().build()
    }
}

// Each dictionary value is an object carrying the .NET type name in "T"
// and the payload in "V".
fn tv_entry(type_name: &'static str, value: PsValue) -> PsValue {
    let mut obj = ComplexObject::new();
    obj.insert_extended("T", PsPrimitiveValue::from(type_name));
    obj.insert_extended("V", value);
    PsValue::Object(obj)
}

fn color_entry(value: i32) -> PsValue {
    tv_entry("System.ConsoleColor", PsValue::from(value))
}

fn coordinates_entry(c: Coordinates) -> PsValue {
    let mut inner = ComplexObject::new();
    inner.insert_extended("x", c.x);
    inner.insert_extended("y", c.y);
    tv_entry(
        "System.Management.Automation.Host.Coordinates",
        PsValue::Object(inner),
    )
}

fn size_entry(s: Size) -> PsValue {
    let mut inner = ComplexObject::new();
    inner.insert_extended("width", s.width);
    inner.insert_extended("height", s.height);
    tv_entry(
        "System.Management.Automation.Host.Size",
        PsValue::Object(inner),
    )
}

fn tv_value(value: &PsValue) -> Result<&PsValue, crate::PsrpError> {
    let obj = value
        .as_object()
        .ok_or_else(|| crate::PsrpError::InvalidMessage("host data entry must be an object".to_string()))?;
    decode::required(obj, "V")
}

fn decode_coordinates(value: &PsValue) -> Result<Coordinates, crate::PsrpError> {
    let inner = tv_value(value)?
        .as_object()
        .ok_or_else(|| crate::PsrpError::InvalidMessage("coordinates payload must be an object".to_string()))?;
    Ok(Coordinates {
        x: decode::required_i32(inner, "x")?,
        y: decode::required_i32(inner, "y")?,
    })
}

fn decode_size(value: &PsValue) -> Result<Size, crate::PsrpError> {
    let inner = tv_value(value)?
        .as_object()
        .ok_or_else(|| crate::PsrpError::InvalidMessage("size payload must be an object".to_string()))?;
    Ok(Size {
        width: decode::required_i32(inner, "width")?,
        height: decode::required_i32(inner, "height")?,
    })
}

impl HostDefaultData {
    /// The `_hostDefaultData.data` dictionary, keyed by I32 indexes.
    pub fn to_dictionary(&self) -> Vec<(PsValue, PsValue)> {
        vec![
            (PsValue::from(0), color_entry(self.foreground_color)),
            (PsValue::from(1), color_entry(self.background_color)),
            (PsValue::from(2), coordinates_entry(self.cursor_position)),
            (PsValue::from(3), coordinates_entry(self.window_position)),
            (
                PsValue::from(4),
                tv_entry("System.Int32", PsValue::from(self.cursor_size)),
            ),
            (PsValue::from(5), size_entry(self.buffer_size)),
            (PsValue::from(6), size_entry(self.window_size)),
            (PsValue::from(7), size_entry(self.max_window_size)),
            (PsValue::from(8), size_entry(self.max_physical_window_size)),
            (
                PsValue::from(9),
                tv_entry("System.String", PsValue::from(self.window_title.clone())),
            ),
        ]
    }

    pub fn from_dictionary(entries: &[(PsValue, PsValue)]) -> Result<Self, crate::PsrpError> {
        let mut data = Self::default();
        for (key, value) in entries {
            let Some(index) = key.as_i32() else { continue };
            match index {
                0 => data.foreground_color = tv_value(value)?.as_i32().unwrap_or(7),
                1 => data.background_color = tv_value(value)?.as_i32().unwrap_or(0),
                2 => data.cursor_position = decode_coordinates(value)?,
                3 => data.window_position = decode_coordinates(value)?,
                4 => data.cursor_size = tv_value(value)?.as_i32().unwrap_or(25),
                5 => data.buffer_size = decode_size(value)?,
                6 => data.window_size = decode_size(value)?,
                7 => data.max_window_size = decode_size(value)?,
                8 => data.max_physical_window_size = decode_size(value)?,
                9 => {
                    data.window_title = tv_value(value)?
                        .as_string()
                        .unwrap_or_default();
                }
                _ => {}
            }
        }
        Ok(data)
    }
}

/// Host capability flags plus the optional console snapshot.
#[expect(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct HostInfo {
    #[builder(default = true)]
    pub is_host_null: bool,
    #[builder(default = true)]
    pub is_host_ui_null: bool,
    #[builder(default = true)]
    pub is_host_raw_ui_null: bool,
    #[builder(default = false)]
    pub use_runspace_host: bool,
    #[builder(default)]
    pub host_default_data: Option<HostDefaultData>,
}

impl Default for HostInfo {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl HostInfo {
    /// A host that can answer UI calls, advertising the given console
    /// snapshot.
    pub fn interactive(data: HostDefaultData) -> Self {
        Self {
            is_host_null: false,
            is_host_ui_null: false,
            is_host_raw_ui_null: false,
            use_runspace_host: false,
            host_default_data: Some(data),
        }
    }
}

impl From<HostInfo> for ComplexObject {
    fn from(host_info: HostInfo) -> Self {
        let mut obj = Self::new();
        obj.insert_extended("_isHostNull", host_info.is_host_null);
        obj.insert_extended("_isHostUINull", host_info.is_host_ui_null);
        obj.insert_extended("_isHostRawUINull", host_info.is_host_raw_ui_null);
        obj.insert_extended("_useRunspaceHost", host_info.use_runspace_host);

        if let Some(data) = host_info.host_default_data {
            let dict = Self {
                type_def: Some(PsType::hashtable()),
                content: ComplexObjectContent::Container(Container::Dictionary(
                    data.to_dictionary(),
                )),
                ..Self::default()
            };
            let mut wrapper = Self::new();
            wrapper.insert_extended("data", PsValue::Object(dict));
            obj.insert_extended("_hostDefaultData", PsValue::Object(wrapper));
        }

        obj
    }
}

impl TryFrom<ComplexObject> for HostInfo {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        let host_default_data = match value.property("_hostDefaultData") {
            Some(PsValue::Object(wrapper)) => match wrapper.property("data") {
                Some(PsValue::Object(dict)) => match dict.container() {
                    Some(Container::Dictionary(entries)) => {
                        Some(HostDefaultData::from_dictionary(entries)?)
                    }
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        };

        Ok(Self {
            is_host_null: decode::required_bool(&value, "_isHostNull")?,
            is_host_ui_null: decode::required_bool(&value, "_isHostUINull")?,
            is_host_raw_ui_null: decode::required_bool(&value, "_isHostRawUINull")?,
            use_runspace_host: decode::required_bool(&value, "_useRunspaceHost")?,
            host_default_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_host_round_trip() {
        let info = HostInfo::builder().build();
        let obj = ComplexObject::from(info.clone());
        assert_eq!(HostInfo::try_from(obj).unwrap(), info);
    }

    #[test]
    fn interactive_host_round_trip() {
        let info = HostInfo::interactive(
            HostDefaultData::builder()
                .window_title("poshwire")
                .cursor_position(Coordinates { x: 4, y: 9 })
                .build(),
        );
        let obj = ComplexObject::from(info.clone());
        let parsed = HostInfo::try_from(obj).unwrap();
        assert_eq!(parsed, info);
        let data = parsed.host_default_data.unwrap();
        assert_eq!(data.window_title, "poshwire");
        assert_eq!(data.cursor_position, Coordinates { x: 4, y: 9 });
    }
}
