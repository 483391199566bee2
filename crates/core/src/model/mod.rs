pub mod profile;
pub mod record;

pub use profile::{AssembledProfile, CallFrame, ProfileKey, ProfileNode};
pub use record::{
    ChunkCpuProfile, ProfileChunkData, ProfileHeaderData, RecordPayload, TraceRecord,
};
