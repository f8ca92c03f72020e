//! Constant pool writer with entry deduplication.

use std::collections::HashMap;

pub(crate) const REF_INVOKE_STATIC: u8 = 6;

/// Deduplicating constant pool writer.
#[derive(Debug, Default)]
pub(crate) struct ConstantPool {
    bytes: Vec<u8>,
    next: u16,
    index: HashMap<Vec<u8>, u16>,
}

impl ConstantPool {
    pub(crate) fn new() -> Self {
        Self {
            bytes: Vec::new(),
            next: 1,
            index: HashMap::new(),
        }
    }

    fn add(&mut self, entry: Vec<u8>, slots: u16) -> u16 {
        if let Some(&index) = self.index.get(&entry) {
            return index;
        }
        let index = self.next;
        self.next += slots;
        self.bytes.extend_from_slice(&entry);
        self.index.insert(entry, index);
        index
    }

    /// `constant_pool_count` followed by the entries.
    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.next.to_be_bytes());
        out.extend_from_slice(&self.bytes);
    }

    pub(crate) fn utf8(&mut self, text: &str) -> u16 {
        let mut entry = vec![1];
        let encoded = modified_utf8(text);
        let len = u16::try_from(encoded.len()).unwrap_or(u16::MAX);
        entry.extend_from_slice(&len.to_be_bytes());
        entry.extend_from_slice(&encoded);
        self.add(entry, 1)
    }

    /// `name` in internal form (`java/lang/String`) or an array descriptor.
    pub(crate) fn class(&mut self, internal: &str) -> u16 {
        let name = self.utf8(internal);
        self.add(tagged(7, &[name]), 1)
    }

    pub(crate) fn string(&mut self, text: &str) -> u16 {
        let utf8 = self.utf8(text);
        self.add(tagged(8, &[utf8]), 1)
    }

    pub(crate) fn long(&mut self, value: i64) -> u16 {
        let mut entry = vec![5];
        entry.extend_from_slice(&value.to_be_bytes());
        self.add(entry, 2)
    }

    pub(crate) fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.add(tagged(12, &[name, descriptor]), 1)
    }

    fn member(&mut self, tag: u8, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let nat = self.name_and_type(name, descriptor);
        self.add(tagged(tag, &[class, nat]), 1)
    }

    pub(crate) fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        self.member(9, owner, name, descriptor)
    }

    pub(crate) fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        self.member(10, owner, name, descriptor)
    }

    pub(crate) fn interface_method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        self.member(11, owner, name, descriptor)
    }

    pub(crate) fn method_handle(&mut self, kind: u8, reference: u16) -> u16 {
        let mut entry = vec![15, kind];
        entry.extend_from_slice(&reference.to_be_bytes());
        self.add(entry, 1)
    }

    pub(crate) fn method_type(&mut self, descriptor: &str) -> u16 {
        let descriptor = self.utf8(descriptor);
        self.add(tagged(16, &[descriptor]), 1)
    }

    pub(crate) fn invoke_dynamic(&mut self, bootstrap: u16, name: &str, descriptor: &str) -> u16 {
        let nat = self.name_and_type(name, descriptor);
        self.add(tagged(18, &[bootstrap, nat]), 1)
    }
}

fn tagged(tag: u8, operands: &[u16]) -> Vec<u8> {
    let mut entry = vec![tag];
    for operand in operands {
        entry.extend_from_slice(&operand.to_be_bytes());
    }
    entry
}

/// Java's modified UTF-8: NUL as two bytes, supplementary characters as
/// surrogate pairs.
pub(crate) fn modified_utf8(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for unit in text.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_deduplicated() {
        let mut pool = ConstantPool::new();
        let a = pool.class("java/lang/Object");
        let b = pool.class("java/lang/Object");
        assert_eq!(a, b);
        assert_eq!(a, 2); // utf8 first, then the class entry
    }

    #[test]
    fn longs_take_two_slots() {
        let mut pool = ConstantPool::new();
        assert_eq!(pool.long(7), 1);
        assert_eq!(pool.utf8("x"), 3);
    }

    #[test]
    fn modified_utf8_encodes_nul_and_supplementary() {
        assert_eq!(modified_utf8("\0"), vec![0xC0, 0x80]);
        assert_eq!(modified_utf8("A"), vec![b'A']);
        assert_eq!(modified_utf8("\u{1F600}").len(), 6);
    }
}
