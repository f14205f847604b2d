//! buffer primitives for reading and writing DNS packets
//!
//! All wire-format handling goes through the `PacketBuffer` trait, which
//! keeps the protocol layer agnostic of the underlying storage. Two
//! implementations are provided: `BytePacketBuffer`, a fixed 512 byte array
//! sized for plain UDP datagrams, and `VectorPacketBuffer`, a growable
//! buffer that performs label compression while writing.

use std::collections::HashMap;

use derive_more::{Display, Error, From};

#[derive(Debug, Display, From, Error)]
pub enum BufferError {
    EndOfBuffer,
    LabelTooLong,
    NameTooLong,
    EmptyLabel,
    InvalidJump,
    Io(std::io::Error),
}

type Result<T> = std::result::Result<T, BufferError>;

/// Longest label the wire format can carry: the length octet caps at 63
const MAX_LABEL_LENGTH: usize = 63;

/// Longest full domain name, including separators
const MAX_NAME_LENGTH: usize = 255;

/// Upper bound on compression pointer hops while reading a name
const MAX_JUMPS: usize = 5;

pub trait PacketBuffer {
    fn read(&mut self) -> Result<u8>;
    fn get(&mut self, pos: usize) -> Result<u8>;
    fn get_range(&mut self, start: usize, len: usize) -> Result<&[u8]>;
    fn write(&mut self, val: u8) -> Result<()>;
    fn set(&mut self, pos: usize, val: u8) -> Result<()>;
    fn pos(&self) -> usize;
    fn seek(&mut self, pos: usize) -> Result<()>;
    fn step(&mut self, steps: usize) -> Result<()>;

    fn find_label(&self, label: &str) -> Option<usize>;
    fn save_label(&mut self, label: &str, pos: usize);

    fn write_u8(&mut self, val: u8) -> Result<()> {
        self.write(val)
    }

    fn write_u16(&mut self, val: u16) -> Result<()> {
        self.write((val >> 8) as u8)?;
        self.write((val & 0xFF) as u8)?;

        Ok(())
    }

    fn write_u32(&mut self, val: u32) -> Result<()> {
        self.write(((val >> 24) & 0xFF) as u8)?;
        self.write(((val >> 16) & 0xFF) as u8)?;
        self.write(((val >> 8) & 0xFF) as u8)?;
        self.write((val & 0xFF) as u8)?;

        Ok(())
    }

    fn set_u16(&mut self, pos: usize, val: u16) -> Result<()> {
        self.set(pos, (val >> 8) as u8)?;
        self.set(pos + 1, (val & 0xFF) as u8)?;

        Ok(())
    }

    fn read_u16(&mut self) -> Result<u16> {
        let res = ((self.read()? as u16) << 8) | (self.read()? as u16);

        Ok(res)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let res = ((self.read()? as u32) << 24)
            | ((self.read()? as u32) << 16)
            | ((self.read()? as u32) << 8)
            | (self.read()? as u32);

        Ok(res)
    }

    /// Write a domain name as length-prefixed labels terminated by a zero
    /// octet, emitting a compression pointer when a stored suffix matches.
    fn write_qname(&mut self, qname: &str) -> Result<()> {
        if qname.len() > MAX_NAME_LENGTH {
            return Err(BufferError::NameTooLong);
        }

        let split = qname.split('.').collect::<Vec<&str>>();
        let mut labels = &split[..];

        // Accept one trailing dot for fully qualified names
        if let Some((last, rest)) = labels.split_last() {
            if last.is_empty() {
                labels = rest;
            }
        }

        let mut jump_performed = false;
        for (i, label) in labels.iter().enumerate() {
            if label.is_empty() {
                return Err(BufferError::EmptyLabel);
            }
            if label.len() > MAX_LABEL_LENGTH {
                return Err(BufferError::LabelTooLong);
            }

            let suffix = labels[i..].join(".");
            if let Some(prev_pos) = self.find_label(&suffix) {
                let jump_inst = (prev_pos as u16) | 0xC000;
                self.write_u16(jump_inst)?;
                jump_performed = true;
                break;
            }

            let pos = self.pos();
            self.save_label(&suffix, pos);

            self.write_u8(label.len() as u8)?;
            for b in label.as_bytes() {
                self.write_u8(*b)?;
            }
        }

        if !jump_performed {
            self.write_u8(0)?;
        }

        Ok(())
    }

    /// Read a domain name, following compression pointers without moving
    /// the read position past the initial encoding.
    fn read_qname(&mut self, outstr: &mut String) -> Result<()> {
        let mut pos = self.pos();
        let mut jumped = false;
        let mut jumps_performed = 0;

        let mut delim = "";
        loop {
            // Refuse pointer chains long enough to be a loop
            if jumps_performed > MAX_JUMPS {
                return Err(BufferError::InvalidJump);
            }

            let len = self.get(pos)?;

            if (len & 0xC0) == 0xC0 {
                if !jumped {
                    self.seek(pos + 2)?;
                }

                let b2 = self.get(pos + 1)? as u16;
                let offset = (((len as u16) ^ 0xC0) << 8) | b2;
                pos = offset as usize;

                jumped = true;
                jumps_performed += 1;

                continue;
            }

            pos += 1;

            if len == 0 {
                break;
            }

            outstr.push_str(delim);

            let label = self.get_range(pos, len as usize)?;
            outstr.push_str(&String::from_utf8_lossy(label).to_lowercase());

            delim = ".";
            pos += len as usize;

            if outstr.len() > MAX_NAME_LENGTH {
                return Err(BufferError::NameTooLong);
            }
        }

        if !jumped {
            self.seek(pos)?;
        }

        Ok(())
    }
}

/// A fixed-size buffer matching the 512 byte ceiling of a plain UDP message
pub struct BytePacketBuffer {
    pub buf: [u8; 512],
    pub pos: usize,
}

impl Default for BytePacketBuffer {
    fn default() -> Self {
        BytePacketBuffer::new()
    }
}

impl BytePacketBuffer {
    pub fn new() -> BytePacketBuffer {
        BytePacketBuffer {
            buf: [0; 512],
            pos: 0,
        }
    }
}

impl PacketBuffer for BytePacketBuffer {
    fn read(&mut self) -> Result<u8> {
        if self.pos >= self.buf.len() {
            return Err(BufferError::EndOfBuffer);
        }

        let res = self.buf[self.pos];
        self.pos += 1;

        Ok(res)
    }

    fn get(&mut self, pos: usize) -> Result<u8> {
        if pos >= self.buf.len() {
            return Err(BufferError::EndOfBuffer);
        }

        Ok(self.buf[pos])
    }

    fn get_range(&mut self, start: usize, len: usize) -> Result<&[u8]> {
        if start + len > self.buf.len() {
            return Err(BufferError::EndOfBuffer);
        }

        Ok(&self.buf[start..start + len])
    }

    fn write(&mut self, val: u8) -> Result<()> {
        if self.pos >= self.buf.len() {
            return Err(BufferError::EndOfBuffer);
        }

        self.buf[self.pos] = val;
        self.pos += 1;

        Ok(())
    }

    fn set(&mut self, pos: usize, val: u8) -> Result<()> {
        if pos >= self.buf.len() {
            return Err(BufferError::EndOfBuffer);
        }

        self.buf[pos] = val;

        Ok(())
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            return Err(BufferError::EndOfBuffer);
        }

        self.pos = pos;

        Ok(())
    }

    fn step(&mut self, steps: usize) -> Result<()> {
        self.seek(self.pos + steps)
    }

    fn find_label(&self, _label: &str) -> Option<usize> {
        None
    }

    fn save_label(&mut self, _label: &str, _pos: usize) {}
}

/// A growable buffer which compresses repeated names while writing
#[derive(Default)]
pub struct VectorPacketBuffer {
    pub buffer: Vec<u8>,
    pub pos: usize,
    label_lookup: HashMap<String, usize>,
}

impl VectorPacketBuffer {
    pub fn new() -> VectorPacketBuffer {
        VectorPacketBuffer {
            buffer: Vec::new(),
            pos: 0,
            label_lookup: HashMap::new(),
        }
    }
}

impl PacketBuffer for VectorPacketBuffer {
    fn read(&mut self) -> Result<u8> {
        if self.pos >= self.buffer.len() {
            return Err(BufferError::EndOfBuffer);
        }

        let res = self.buffer[self.pos];
        self.pos += 1;

        Ok(res)
    }

    fn get(&mut self, pos: usize) -> Result<u8> {
        if pos >= self.buffer.len() {
            return Err(BufferError::EndOfBuffer);
        }

        Ok(self.buffer[pos])
    }

    fn get_range(&mut self, start: usize, len: usize) -> Result<&[u8]> {
        if start + len > self.buffer.len() {
            return Err(BufferError::EndOfBuffer);
        }

        Ok(&self.buffer[start..start + len])
    }

    fn write(&mut self, val: u8) -> Result<()> {
        self.buffer.push(val);
        self.pos += 1;

        Ok(())
    }

    fn set(&mut self, pos: usize, val: u8) -> Result<()> {
        if pos >= self.buffer.len() {
            return Err(BufferError::EndOfBuffer);
        }

        self.buffer[pos] = val;

        Ok(())
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.buffer.len() {
            return Err(BufferError::EndOfBuffer);
        }

        self.pos = pos;

        Ok(())
    }

    fn step(&mut self, steps: usize) -> Result<()> {
        self.seek(self.pos + steps)
    }

    fn find_label(&self, label: &str) -> Option<usize> {
        self.label_lookup.get(label).cloned()
    }

    fn save_label(&mut self, label: &str, pos: usize) {
        self.label_lookup.insert(label.to_string(), pos);
    }
}
