pub use ethereum_types::H256;

pub use crate::{
    bit_list::BitList,
    byte_vector::ByteVector,
    consts::{Endianness, Offset, BITS_PER_BYTE, BYTES_PER_CHUNK, BYTES_PER_LENGTH_OFFSET},
    contiguous_list::ContiguousList,
    error::{PushError, ReadError, WriteError},
    merkle::{
        depth_for_bits, depth_for_bytes, depth_for_elements, merkleize_bytes, merkleize_chunks,
        merkleize_container, mix_in_length,
    },
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    shared::{read_offset, subslice, write_offset},
    size::Size,
};

mod basic;
mod bit_list;
mod byte_vector;
mod consts;
mod contiguous_list;
mod error;
mod merkle;
mod porcelain;
mod shared;
mod size;
