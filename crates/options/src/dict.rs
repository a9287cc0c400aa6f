use std::{
    ffi::{CStr, CString, c_char, c_int},
    fmt, ptr,
};

use avgraph_media_info::AvError;
use ffmpeg::ffi;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags::bitflags! {
    /// Lookup and insertion behaviour of the native dictionary.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DictFlags: u32 {
        /// Keys compare case-sensitively.
        const MATCH_CASE = ffi::AV_DICT_MATCH_CASE as u32;
        /// A lookup key matches every entry key it is a prefix of.
        const IGNORE_SUFFIX = ffi::AV_DICT_IGNORE_SUFFIX as u32;
        /// Leave an existing entry untouched.
        const DONT_OVERWRITE = ffi::AV_DICT_DONT_OVERWRITE as u32;
        /// Concatenate onto an existing value instead of replacing it.
        const APPEND = ffi::AV_DICT_APPEND as u32;
        /// Allow several entries with the same key.
        const MULTIKEY = ffi::AV_DICT_MULTIKEY as u32;
    }
}

impl DictFlags {
    fn native(self) -> c_int {
        self.bits() as c_int
    }
}

/// One `key = value` pair, the serialized form of a [`Dictionary`] entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    pub value: String,
}

/// An ordered multi-map of string options backed by an `AVDictionary`, handed
/// to native open/configure calls.
///
/// Replacing or removing an entry moves the last entry into its slot, as the
/// native dictionary does.
pub struct Dictionary {
    inner: ffmpeg::Dictionary<'static>,
}

// SAFETY: the AVDictionary is owned exclusively by this value and is only
// touched through `&mut self` or read-only lookups.
unsafe impl Send for Dictionary {}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            inner: ffmpeg::Dictionary::new(),
        }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self, AvError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut dict = Self::new();
        for (key, value) in pairs {
            dict.set(key.as_ref(), value.as_ref(), DictFlags::empty())?;
        }
        Ok(dict)
    }

    pub fn set(&mut self, key: &str, value: &str, flags: DictFlags) -> Result<(), AvError> {
        let (key, value) = (c_string(key)?, c_string(value)?);
        // SAFETY: both strings are NUL-terminated and copied by the callee.
        self.with_native(|dict| unsafe {
            ffi::av_dict_set(dict, key.as_ptr(), value.as_ptr(), flags.native())
        })
    }

    pub fn set_int(&mut self, key: &str, value: i64, flags: DictFlags) -> Result<(), AvError> {
        let key = c_string(key)?;
        // SAFETY: see `set`.
        self.with_native(|dict| unsafe {
            ffi::av_dict_set_int(dict, key.as_ptr(), value, flags.native())
        })
    }

    pub fn get(&self, key: &str, flags: DictFlags) -> Option<&str> {
        let key = CString::new(key).ok()?;
        self.lookup(&key, ptr::null(), flags)
            .map(|(_, value, _)| value)
    }

    /// Every value stored under `key`, in dictionary order.
    pub fn get_all(&self, key: &str, flags: DictFlags) -> Vec<&str> {
        let Ok(key) = CString::new(key) else {
            return Vec::new();
        };
        self.scan(&key, flags)
            .into_iter()
            .map(|(_, value)| value)
            .collect()
    }

    /// Removes the first entry matching `key` and returns its value.
    pub fn remove(&mut self, key: &str, flags: DictFlags) -> Option<String> {
        let flags = flags.difference(DictFlags::MULTIKEY);
        let value = self.get(key, flags)?.to_string();
        let key = CString::new(key).ok()?;

        // SAFETY: a null value deletes the matched entry.
        self.with_native(|dict| unsafe {
            ffi::av_dict_set(dict, key.as_ptr(), ptr::null(), flags.native())
        })
        .ok()?;

        Some(value)
    }

    /// Copies every entry of `other` into `self` with the given flags.
    pub fn merge(&mut self, other: &Dictionary, flags: DictFlags) -> Result<(), AvError> {
        // SAFETY: `other` is a live dictionary distinct from `self`.
        self.with_native(|dict| unsafe {
            ffi::av_dict_copy(dict, other.inner.as_ptr(), flags.native())
        })
    }

    pub fn count(&self) -> usize {
        // SAFETY: counting accepts a null dictionary.
        let count = unsafe { ffi::av_dict_count(self.inner.as_ptr()) };
        usize::try_from(count).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.scan(c"", DictFlags::IGNORE_SUFFIX).into_iter()
    }

    /// Renders the entries in the native `key=value:key=value` option syntax,
    /// escaping separators with a backslash.
    pub fn to_option_string(&self) -> Result<String, AvError> {
        let mut buffer: *mut c_char = ptr::null_mut();
        // SAFETY: on success `buffer` holds a NUL-terminated string we own.
        unsafe {
            AvError::check(ffi::av_dict_get_string(
                self.inner.as_ptr(),
                &mut buffer,
                b'=' as c_char,
                b':' as c_char,
            ))?;
            let rendered = CStr::from_ptr(buffer).to_string_lossy().into_owned();
            ffi::av_free(buffer.cast());
            Ok(rendered)
        }
    }

    /// The owned native dictionary, for calls that consume or rewrite one.
    pub fn to_native(&self) -> ffmpeg::Dictionary<'static> {
        self.clone().inner
    }

    /// Runs a native setter that may reallocate or free the dictionary.
    fn with_native(
        &mut self,
        update: impl FnOnce(*mut *mut ffi::AVDictionary) -> c_int,
    ) -> Result<(), AvError> {
        let inner = std::mem::replace(&mut self.inner, ffmpeg::Dictionary::new());
        // SAFETY: ownership of the pointer leaves `inner` and comes back
        // right after the call, whatever it did to the allocation.
        let mut native = unsafe { inner.disown() };
        let ret = update(&mut native);
        self.inner = unsafe { ffmpeg::Dictionary::own(native) };

        AvError::check(ret).map(drop)
    }

    fn lookup(
        &self,
        key: &CStr,
        previous: *const ffi::AVDictionaryEntry,
        flags: DictFlags,
    ) -> Option<(&str, &str, *const ffi::AVDictionaryEntry)> {
        // SAFETY: entries stay valid while `self` is borrowed immutably.
        unsafe {
            let entry = ffi::av_dict_get(self.inner.as_ptr(), key.as_ptr(), previous, flags.native());
            if entry.is_null() {
                return None;
            }
            Some((text((*entry).key), text((*entry).value), entry.cast_const()))
        }
    }

    fn scan(&self, key: &CStr, flags: DictFlags) -> Vec<(&str, &str)> {
        let mut entries = Vec::new();
        let mut previous = ptr::null();
        while let Some((found, value, entry)) = self.lookup(key, previous, flags) {
            entries.push((found, value));
            previous = entry;
        }
        entries
    }
}

/// # Safety
///
/// `value` must be a NUL-terminated string that outlives `'a`.
unsafe fn text<'a>(value: *const c_char) -> &'a str {
    unsafe { CStr::from_ptr(value) }.to_str().unwrap_or_default()
}

fn c_string(value: &str) -> Result<CString, AvError> {
    CString::new(value).map_err(|_| AvError::EINVAL)
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Dictionary {
    fn clone(&self) -> Self {
        let mut copy = Self::new();
        // Only allocation failure can stop the copy short.
        copy.merge(self, DictFlags::MULTIKEY).ok();
        copy
    }
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for Dictionary {}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Display for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self
            .iter()
            .map(|(key, value)| format!("{{{key}: {value}}}"))
            .collect::<Vec<_>>()
            .join(",");

        write!(f, "{{count: {}; {{{}}}}}", self.count(), entries)
    }
}

impl Serialize for Dictionary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(|(key, value)| Entry {
            key: key.to_string(),
            value: value.to_string(),
        }))
    }
}

impl<'de> Deserialize<'de> for Dictionary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<Entry>::deserialize(deserializer)?;

        let mut dict = Self::new();
        for entry in entries {
            dict.set(&entry.key, &entry.value, DictFlags::MULTIKEY)
                .map_err(serde::de::Error::custom)?;
        }
        Ok(dict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dict(pairs: &[(&str, &str)]) -> Dictionary {
        Dictionary::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn set_replaces_existing_value() {
        let mut dict = dict(&[("rtsp_transport", "udp"), ("stimeout", "1")]);
        dict.set("rtsp_transport", "tcp", DictFlags::empty()).unwrap();

        assert_eq!(dict.get("rtsp_transport", DictFlags::empty()), Some("tcp"));
        assert_eq!(dict.get("stimeout", DictFlags::empty()), Some("1"));
        assert_eq!(dict.count(), 2);
    }

    #[test]
    fn lookups_ignore_case_unless_asked() {
        let dict = dict(&[("Threads", "auto")]);

        assert_eq!(dict.get("threads", DictFlags::empty()), Some("auto"));
        assert_eq!(dict.get("threads", DictFlags::MATCH_CASE), None);
    }

    #[test]
    fn ignore_suffix_matches_prefix() {
        let dict = dict(&[("scale_sws_opts", "flags=bicubic")]);

        assert_eq!(dict.get("scale", DictFlags::IGNORE_SUFFIX), Some("flags=bicubic"));
        assert_eq!(dict.get("scale", DictFlags::empty()), None);
    }

    #[test]
    fn dont_overwrite_keeps_first_value() {
        let mut dict = Dictionary::new();
        dict.set("threads", "4", DictFlags::empty()).unwrap();
        dict.set("threads", "auto", DictFlags::DONT_OVERWRITE).unwrap();

        assert_eq!(dict.get("threads", DictFlags::empty()), Some("4"));
    }

    #[test]
    fn append_concatenates() {
        let mut dict = Dictionary::new();
        dict.set("flags", "+global_header", DictFlags::APPEND).unwrap();
        dict.set("flags", "+low_delay", DictFlags::APPEND).unwrap();

        assert_eq!(dict.get("flags", DictFlags::empty()), Some("+global_header+low_delay"));
        assert_eq!(dict.count(), 1);
    }

    #[test]
    fn multikey_keeps_every_entry() {
        let mut dict = Dictionary::new();
        dict.set("map", "0:v", DictFlags::MULTIKEY).unwrap();
        dict.set("map", "0:a", DictFlags::MULTIKEY).unwrap();

        assert_eq!(dict.get_all("map", DictFlags::empty()), vec!["0:v", "0:a"]);
        assert_eq!(dict.remove("map", DictFlags::empty()), Some("0:v".to_string()));
        assert_eq!(dict.count(), 1);
        assert_eq!(dict.remove("map", DictFlags::empty()), Some("0:a".to_string()));
        assert!(dict.is_empty());
        assert_eq!(dict.remove("map", DictFlags::empty()), None);
    }

    #[test]
    fn set_int_stores_decimal() {
        let mut dict = Dictionary::new();
        dict.set_int("stimeout", 10_000_000, DictFlags::empty()).unwrap();

        assert_eq!(dict.get("stimeout", DictFlags::empty()), Some("10000000"));
    }

    #[test]
    fn merge_respects_flags() {
        let mut target = dict(&[("threads", "4")]);
        target
            .merge(&dict(&[("threads", "auto"), ("preset", "fast")]), DictFlags::DONT_OVERWRITE)
            .unwrap();

        assert_eq!(target.get("threads", DictFlags::empty()), Some("4"));
        assert_eq!(target.get("preset", DictFlags::empty()), Some("fast"));
    }

    #[test]
    fn interior_nul_is_rejected() {
        let mut dict = Dictionary::new();
        assert_eq!(dict.set("bad\0key", "1", DictFlags::empty()), Err(AvError::EINVAL));
        assert!(dict.is_empty());
    }

    #[test]
    fn dump_format() {
        assert_eq!(dict(&[("a", "1"), ("b", "2")]).to_string(), "{count: 2; {{a: 1},{b: 2}}}");
        assert_eq!(Dictionary::new().to_string(), "{count: 0; {}}");
    }

    #[test]
    fn option_string_escapes_separators() {
        let dict = dict(&[("flags", "bicubic"), ("filter", "a=b:c")]);
        assert_eq!(dict.to_option_string().unwrap(), "flags=bicubic:filter=a\\=b\\:c");
        assert_eq!(Dictionary::new().to_option_string().unwrap(), "");
    }

    #[test]
    fn serializes_as_entry_list() {
        let dict = dict(&[("threads", "auto")]);
        let json = serde_json::to_string(&dict).unwrap();

        assert_eq!(json, r#"[{"key":"threads","value":"auto"}]"#);
        assert_eq!(serde_json::from_str::<Dictionary>(&json).unwrap(), dict);
    }

    #[test]
    fn clones_keep_repeated_keys() {
        let mut original = Dictionary::new();
        original.set("map", "0:v", DictFlags::MULTIKEY).unwrap();
        original.set("map", "0:a", DictFlags::MULTIKEY).unwrap();

        let copy = original.clone();
        assert_eq!(copy.get_all("map", DictFlags::empty()), vec!["0:v", "0:a"]);
        assert_eq!(copy, original);
    }

    #[test]
    fn clones_are_independent() {
        let original = dict(&[("threads", "auto")]);
        let mut copy = original.clone();
        copy.set("threads", "2", DictFlags::empty()).unwrap();

        assert_eq!(original.get("threads", DictFlags::empty()), Some("auto"));
        assert_eq!(copy.get("threads", DictFlags::empty()), Some("2"));
    }
}
