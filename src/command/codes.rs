//! `sf_command` codes

use serde::{Deserialize, Serialize};

/// Commands understood by `sf_command` that this crate issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    GetLibVersion,
    GetLogInfo,
    GetCurrentSfInfo,
    GetNormDouble,
    GetNormFloat,
    SetNormDouble,
    SetNormFloat,
    GetSimpleFormatCount,
    GetFormatMajorCount,
    GetFormatSubtypeCount,
    CalcSignalMax,
    CalcNormSignalMax,
    CalcMaxAllChannels,
    CalcNormMaxAllChannels,
    GetSignalMax,
    GetMaxAllChannels,
    SetAddPeakChunk,
    UpdateHeaderNow,
    SetUpdateHeaderAuto,
    FileTruncate,
    SetRawStartOffset,
    SetClipping,
    GetClipping,
}

impl Command {
    /// Native `SFC_*` value
    pub fn code(self) -> i32 {
        match self {
            Command::GetLibVersion => 0x1000,
            Command::GetLogInfo => 0x1001,
            Command::GetCurrentSfInfo => 0x1002,
            Command::GetNormDouble => 0x1010,
            Command::GetNormFloat => 0x1011,
            Command::SetNormDouble => 0x1012,
            Command::SetNormFloat => 0x1013,
            Command::GetSimpleFormatCount => 0x1020,
            Command::GetFormatMajorCount => 0x1030,
            Command::GetFormatSubtypeCount => 0x1032,
            Command::CalcSignalMax => 0x1040,
            Command::CalcNormSignalMax => 0x1041,
            Command::CalcMaxAllChannels => 0x1042,
            Command::CalcNormMaxAllChannels => 0x1043,
            Command::GetSignalMax => 0x1044,
            Command::GetMaxAllChannels => 0x1045,
            Command::SetAddPeakChunk => 0x1050,
            Command::UpdateHeaderNow => 0x1060,
            Command::SetUpdateHeaderAuto => 0x1061,
            Command::FileTruncate => 0x1080,
            Command::SetRawStartOffset => 0x1090,
            Command::SetClipping => 0x10C0,
            Command::GetClipping => 0x10C1,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    pub const ALL: [Command; 23] = [
        Command::GetLibVersion,
        Command::GetLogInfo,
        Command::GetCurrentSfInfo,
        Command::GetNormDouble,
        Command::GetNormFloat,
        Command::SetNormDouble,
        Command::SetNormFloat,
        Command::GetSimpleFormatCount,
        Command::GetFormatMajorCount,
        Command::GetFormatSubtypeCount,
        Command::CalcSignalMax,
        Command::CalcNormSignalMax,
        Command::CalcMaxAllChannels,
        Command::CalcNormMaxAllChannels,
        Command::GetSignalMax,
        Command::GetMaxAllChannels,
        Command::SetAddPeakChunk,
        Command::UpdateHeaderNow,
        Command::SetUpdateHeaderAuto,
        Command::FileTruncate,
        Command::SetRawStartOffset,
        Command::SetClipping,
        Command::GetClipping,
    ];
}
