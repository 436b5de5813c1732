use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectType {
    Blob,
    Tree,
}

impl ObjectType {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
        }
    }

    /// Consume the `<type> <size>\0` prefix of a serialized object and return
    /// the type together with the declared content size.
    pub fn parse_header(data_reader: &mut impl BufRead) -> anyhow::Result<(ObjectType, usize)> {
        let mut object_type = Vec::new();
        data_reader.read_until(b' ', &mut object_type)?;

        let object_type = String::from_utf8(object_type)?;
        let object_type = ObjectType::try_from(object_type.trim())?;

        let mut size = Vec::new();
        data_reader.read_until(b'\0', &mut size)?;
        if size.last() != Some(&b'\0') {
            return Err(anyhow::anyhow!("Unterminated object header"));
        }
        size.pop();

        let size = std::str::from_utf8(&size)?
            .parse::<usize>()
            .map_err(|_| anyhow::anyhow!("Invalid size in object header"))?;

        Ok((object_type, size))
    }
}

impl TryFrom<&str> for ObjectType {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> anyhow::Result<Self> {
        match value {
            "blob" => Ok(ObjectType::Blob),
            "tree" => Ok(ObjectType::Tree),
            _ => Err(anyhow::anyhow!("Invalid object type: {value}")),
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
