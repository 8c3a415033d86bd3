use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// 提取工具输出的原始表格
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub data: Vec<Vec<String>>,
}

/// 报告中的一行（一个学生）
///
/// 保留表头顺序，序列化为 JSON 对象
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportRow {
    cells: Vec<(String, String)>,
}

impl ReportRow {
    /// 按表头组装一行，缺失的单元格补空字符串
    pub fn from_cells(headers: &[String], values: &[String]) -> Self {
        let cells = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), values.get(i).cloned().unwrap_or_default()))
            .collect();
        Self { cells }
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    /// 所有单元格 trim 后都为空
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }
}

impl Serialize for ReportRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (header, value) in &self.cells {
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

/// 整份报告
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SheetReport {
    pub headers: Vec<String>,
    pub rows: Vec<ReportRow>,
}

/// 单个学生的报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentReport {
    /// 在报告中的位置（从 0 开始）
    pub index: usize,
    pub row: ReportRow,
}

/// 报告中的一项，前端按"项目/内容"两列展示
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportItem {
    #[serde(rename = "项目")]
    pub item: String,
    #[serde(rename = "内容")]
    pub content: String,
}

impl StudentReport {
    /// 转为"项目/内容"列表
    pub fn items(&self) -> Vec<ReportItem> {
        self.row
            .cells()
            .map(|(item, content)| ReportItem {
                item: item.to_string(),
                content: content.to_string(),
            })
            .collect()
    }

    /// 第一个表头包含给定关键字的单元格
    pub fn field_containing(&self, keyword: &str) -> Option<&str> {
        self.row
            .cells()
            .find(|(header, _)| header.contains(keyword))
            .map(|(_, value)| value)
    }
}
