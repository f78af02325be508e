// These are re-exported primarily to make `ssz_derive` work without additional dependencies.
pub use ethereum_types::{H160, H256, H32};
pub use hashing;
pub use ssz_derive::Ssz;

pub use crate::{
    arrays::hash_fixed_bytes,
    bit_list::BitList,
    bit_vector::BitVector,
    consts::{Endianness, Offset, BYTES_PER_CHUNK, BYTES_PER_LENGTH_OFFSET},
    contiguous_list::ContiguousList,
    contiguous_vector::ContiguousVector,
    error::{ReadError, WriteError},
    merkle_tree::{depth_for_chunk_count, merkle_proof, mix_in_length, MerkleTree},
    porcelain::{SszHash, SszRead, SszReadExt, SszSize, SszWrite},
    shared::{read_offset_unchecked, subslice, write_offset},
    size::Size,
};

mod arrays;
mod basic;
mod bit_list;
mod bit_vector;
mod consts;
mod contiguous_list;
mod contiguous_vector;
mod error;
mod merkle_tree;
mod porcelain;
mod shared;
mod size;

