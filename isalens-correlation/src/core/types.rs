//! Core data types for disassembly correlation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Functional unit an instruction executes on, as reported in the CSV
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum FunctionalUnit {
    ScalarAlu,
    VectorAlu,
    ScalarMemory,
    VectorMemory,
    Lds,
    GdsExport,
    FlowControl,
    Branch,
    /// Text the compiler emitted that is not in the known vocabulary
    Unknown(String),
}

impl FunctionalUnit {
    /// Classify the functional-unit column text
    pub fn parse(text: &str) -> Self {
        match text.trim() {
            "Scalar ALU" => FunctionalUnit::ScalarAlu,
            "Vector ALU" => FunctionalUnit::VectorAlu,
            "Scalar Memory" => FunctionalUnit::ScalarMemory,
            "Vector Memory" => FunctionalUnit::VectorMemory,
            "LDS" => FunctionalUnit::Lds,
            "GDS/Export" => FunctionalUnit::GdsExport,
            "Flow Control" => FunctionalUnit::FlowControl,
            "Branch" => FunctionalUnit::Branch,
            other => FunctionalUnit::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FunctionalUnit::ScalarAlu => "Scalar ALU",
            FunctionalUnit::VectorAlu => "Vector ALU",
            FunctionalUnit::ScalarMemory => "Scalar Memory",
            FunctionalUnit::VectorMemory => "Vector Memory",
            FunctionalUnit::Lds => "LDS",
            FunctionalUnit::GdsExport => "GDS/Export",
            FunctionalUnit::FlowControl => "Flow Control",
            FunctionalUnit::Branch => "Branch",
            FunctionalUnit::Unknown(text) => text,
        }
    }
}

impl fmt::Display for FunctionalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One instruction row of the disassembly CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructionLine {
    /// Hex address text, e.g. "0x000010"
    pub address: String,
    pub opcode: String,
    pub operands: String,
    pub functional_unit: FunctionalUnit,
    pub cycles: String,
    /// Hex encoding text
    pub binary_encoding: String,
}

impl InstructionLine {
    pub fn is_branch(&self) -> bool {
        self.functional_unit == FunctionalUnit::Branch
    }
}

/// A parsed disassembly row. Its position in the owning sequence is the
/// row's line index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisassemblyLine {
    Instruction(InstructionLine),
    Label { name: String },
}

impl DisassemblyLine {
    pub fn is_label(&self) -> bool {
        matches!(self, DisassemblyLine::Label { .. })
    }

    pub fn as_instruction(&self) -> Option<&InstructionLine> {
        match self {
            DisassemblyLine::Instruction(instruction) => Some(instruction),
            DisassemblyLine::Label { .. } => None,
        }
    }

    pub fn label_name(&self) -> Option<&str> {
        match self {
            DisassemblyLine::Label { name } => Some(name),
            DisassemblyLine::Instruction(_) => None,
        }
    }

    /// Opcode of an instruction row; labels have none
    pub fn opcode(&self) -> Option<&str> {
        self.as_instruction().map(|i| i.opcode.as_str())
    }
}

/// Kind of file the command-line compiler produced for an entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    DisassemblyText,
    DisassemblyCsv,
    IlDisassembly,
    Binary,
    ResourceUsage,
    LiveRegisterReport,
    ControlFlowGraph,
}

/// A single output file for one entry point on one GPU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputArtifact {
    pub file_path: PathBuf,
    pub artifact_type: ArtifactType,
    pub gpu_name: String,
}

/// Everything built for one entry point of one input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryOutput {
    pub input_file_path: String,
    pub entrypoint_name: String,
    #[serde(default)]
    pub kernel_type: String,
    #[serde(default)]
    pub artifacts: Vec<OutputArtifact>,
}

impl EntryOutput {
    pub fn new(input_file_path: impl Into<String>, entrypoint_name: impl Into<String>) -> Self {
        Self {
            input_file_path: input_file_path.into(),
            entrypoint_name: entrypoint_name.into(),
            kernel_type: String::new(),
            artifacts: Vec::new(),
        }
    }

    /// Builder-style helper used when assembling outputs by hand
    pub fn with_artifact(
        mut self,
        artifact_type: ArtifactType,
        file_path: impl Into<PathBuf>,
        gpu_name: impl Into<String>,
    ) -> Self {
        self.artifacts.push(OutputArtifact {
            file_path: file_path.into(),
            artifact_type,
            gpu_name: gpu_name.into(),
        });
        self
    }

    /// First artifact path of the given type. The list holds at most one
    /// item per artifact kind, so a linear scan is fine.
    pub fn artifact_path(&self, artifact_type: ArtifactType) -> Option<&Path> {
        self.artifacts
            .iter()
            .find(|artifact| artifact.artifact_type == artifact_type)
            .map(|artifact| artifact.file_path.as_path())
    }
}

/// Columns of the disassembly table, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisassemblyColumn {
    Address,
    Opcode,
    Operands,
    FunctionalUnit,
    Cycles,
    BinaryEncoding,
    LiveVgprs,
}

impl DisassemblyColumn {
    pub const ALL: [DisassemblyColumn; 7] = [
        DisassemblyColumn::Address,
        DisassemblyColumn::Opcode,
        DisassemblyColumn::Operands,
        DisassemblyColumn::FunctionalUnit,
        DisassemblyColumn::Cycles,
        DisassemblyColumn::BinaryEncoding,
        DisassemblyColumn::LiveVgprs,
    ];

    pub fn title(self) -> &'static str {
        match self {
            DisassemblyColumn::Address => "Address",
            DisassemblyColumn::Opcode => "Opcode",
            DisassemblyColumn::Operands => "Operands",
            DisassemblyColumn::FunctionalUnit => "Functional unit",
            DisassemblyColumn::Cycles => "Cycles",
            DisassemblyColumn::BinaryEncoding => "Binary encoding",
            DisassemblyColumn::LiveVgprs => "VGPR pressure",
        }
    }
}

/// The set of table columns the user has chosen to show.
///
/// Passed explicitly to whatever renders rows; there is no global
/// settings object to consult.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisibleColumns(Vec<DisassemblyColumn>);

impl VisibleColumns {
    /// Build from any column list; duplicates are dropped and display
    /// order is restored.
    pub fn new(columns: impl IntoIterator<Item = DisassemblyColumn>) -> Self {
        let mut columns: Vec<_> = columns.into_iter().collect();
        columns.sort();
        columns.dedup();
        Self(columns)
    }

    pub fn all() -> Self {
        Self(DisassemblyColumn::ALL.to_vec())
    }

    pub fn is_visible(&self, column: DisassemblyColumn) -> bool {
        self.0.contains(&column)
    }

    /// Visible columns in display order
    pub fn iter(&self) -> impl Iterator<Item = DisassemblyColumn> + '_ {
        let mut ordered = self.0.clone();
        ordered.sort();
        ordered.dedup();
        ordered.into_iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for VisibleColumns {
    fn default() -> Self {
        Self::all()
    }
}
